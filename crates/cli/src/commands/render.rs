//! `tabmate render` — Stream markdown through the renderer.

use std::io::Read;
use std::path::PathBuf;

use super::{CommandResult, load_config};

pub async fn run(
    input: Option<PathBuf>,
    chunk_size: Option<usize>,
    title: Option<String>,
) -> CommandResult {
    let config = load_config()?;

    let text = match input {
        Some(path) => std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let chunk_size = chunk_size.unwrap_or(config.render.chunk_size);
    if chunk_size == 0 {
        return Err("--chunk-size must be > 0".into());
    }
    let title = title.unwrap_or(config.render.default_code_title);

    println!("{}", render_html(&text, chunk_size, &title));
    Ok(())
}

/// Stream `text` in `chunk_size` pieces and return the root's inner HTML.
pub fn render_html(text: &str, chunk_size: usize, title: &str) -> String {
    let tree = tabmate_render::render_chunked(text, chunk_size, title);
    tracing::debug!(nodes = tree.len(), chunk_size, "Rendered");
    tree.inner_html(tree.root())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_does_not_change_output() {
        let text = "# Notes\nSome **bold** and `code`.\n\n```rust\nfn main() {}\n```\n";
        let whole = render_html(text, text.len(), "Source");
        for size in 1..6 {
            assert_eq!(render_html(text, size, "Source"), whole);
        }
        assert!(whole.contains("<strong>bold</strong>"));
        assert!(whole.contains("<h1>Notes</h1>"));
    }

    #[test]
    fn custom_code_title() {
        let html = render_html("```\nx\n```", 4, "Snippet");
        assert!(html.contains("Snippet"));
    }
}
