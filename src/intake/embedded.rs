use rust_embed::RustEmbed;

/// Static intake UI compiled into the binary.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/ui/"]
pub struct Assets;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_html_is_embedded() {
        let index = Assets::get("index.html").expect("ui/index.html must be embedded");
        let html = String::from_utf8_lossy(&index.data);
        assert!(html.contains("/api/v1/defects"));
    }
}
