//! Generated image and diagram handling.
//!
//! Each asset kind has one merge policy:
//! - images and error details append,
//! - a diagram replaces the previous diagram,
//! - `text-to-image-v3` images replace all previous images.

use crate::types::AssetPayload;

/// What a rendered fragment represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Diagram,
    Detail,
}

/// One markdown-embeddable piece of generated content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFragment {
    pub kind: AssetKind,
    pub markdown: String,
}

/// Ordered generated content for one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedAssets {
    fragments: Vec<AssetFragment>,
}

impl GeneratedAssets {
    /// Merge a payload according to the per-kind policy. `server_url` is
    /// used for the pointer shown in place of Excalidraw scenes, which this
    /// client cannot draw. Returns whether anything changed.
    pub fn merge(&mut self, payload: &AssetPayload, server_url: &str) -> bool {
        let before = self.fragments.len();
        let mut changed = false;

        if let Some(image) = &payload.image {
            changed |= self.merge_image(image, payload, server_url);
        } else if let Some(images) = &payload.images {
            for image in images {
                self.push(AssetKind::Image, format!("![generated_image]({image})\n\n"));
            }
        } else if payload.excalidraw_diagram.is_some() {
            self.replace_diagram(excalidraw_redirect(server_url));
            changed = true;
        } else if let Some(diagram) = &payload.mermaidjs_diagram {
            self.replace_diagram(format!("```mermaid\n{diagram}\n```"));
            changed = true;
        }

        if let Some(detail) = &payload.detail {
            self.push(AssetKind::Detail, detail.clone());
        }

        changed || self.fragments.len() != before
    }

    fn merge_image(&mut self, image: &str, payload: &AssetPayload, server_url: &str) -> bool {
        let inferred = payload
            .inferred_queries
            .as_ref()
            .and_then(|queries| queries.first())
            .map_or("generated image", String::as_str);
        let trailer = format!("\n\n**Inferred Query**:\n\n{inferred}");

        let intent = payload.intent_type.as_deref().unwrap_or_default();
        let markdown = match intent {
            "text-to-image" => format!("![generated_image](data:image/png;base64,{image})"),
            "text-to-image2" => format!("![generated_image]({image})"),
            "text-to-image-v3" => {
                self.fragments.retain(|f| f.kind != AssetKind::Image);
                format!("![generated_image]({image})")
            }
            "excalidraw" => {
                self.replace_diagram(format!("{}{trailer}", excalidraw_redirect(server_url)));
                return true;
            }
            _ if is_url(image) => format!("![generated_image]({image})"),
            _ => format!("![generated_image](data:image/png;base64,{image})"),
        };

        self.push(AssetKind::Image, format!("{markdown}{trailer}"));
        true
    }

    fn replace_diagram(&mut self, markdown: String) {
        self.fragments.retain(|f| f.kind != AssetKind::Diagram);
        self.push(AssetKind::Diagram, markdown);
    }

    fn push(&mut self, kind: AssetKind, markdown: String) {
        self.fragments.push(AssetFragment { kind, markdown });
    }

    pub fn fragments(&self) -> &[AssetFragment] {
        &self.fragments
    }

    pub fn has_image(&self) -> bool {
        self.fragments.iter().any(|f| f.kind == AssetKind::Image)
    }

    pub fn has_diagram(&self) -> bool {
        self.fragments.iter().any(|f| f.kind == AssetKind::Diagram)
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Markdown for all fragments, in arrival order.
    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.markdown.as_str()).collect()
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
    }
}

fn is_url(image: &str) -> bool {
    image.starts_with("http://") || image.starts_with("https://") || image.starts_with("data:")
}

fn excalidraw_redirect(server_url: &str) -> String {
    let domain = if server_url.ends_with('/') {
        server_url.to_string()
    } else {
        format!("{server_url}/")
    };
    format!("Hey, I'm not ready to show you diagrams yet here. But you can view it in {domain}")
}
