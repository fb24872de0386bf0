/// Splits text on blank lines and keeps markdown style headers (`#`)
/// attached to the paragraph that follows them.
///
/// Consecutive headers are stacked into a single prefix. A header at the end
/// of the input with no following content is emitted on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParagraphChunker;

impl ParagraphChunker {
    pub fn chunk(&self, input: &str) -> Vec<String> {
        let mut chunks = vec![];
        let mut header = String::new();

        for paragraph in input.split("\n\n") {
            let paragraph = paragraph.trim();

            if paragraph.is_empty() {
                continue;
            }

            if paragraph.starts_with('#') {
                header.push_str(paragraph);
                header.push('\n');
                continue;
            }

            if header.is_empty() {
                chunks.push(paragraph.to_string());
            } else {
                chunks.push(format!("{header}{paragraph}"));
                header.clear();
            }
        }

        if !header.is_empty() {
            chunks.push(header.trim().to_string());
        }

        chunks
    }
}
