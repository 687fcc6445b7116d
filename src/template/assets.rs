//! Captured page assets.
//!
//! Style and script tags do not emit inline markup; their rendered bodies
//! land here keyed by the owning section, then get injected once into the
//! assembled document. First capture under a key wins, which collapses
//! repeated section includes into a single block.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Css,
    Js,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetBundle {
    css: Vec<(String, String)>,
    js: Vec<(String, String)>,
}

impl AssetBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: AssetKind, key: impl Into<String>, content: impl Into<String>) {
        let bucket = match kind {
            AssetKind::Css => &mut self.css,
            AssetKind::Js => &mut self.js,
        };
        let key = key.into();
        if bucket.iter().any(|(existing, _)| *existing == key) {
            return;
        }
        bucket.push((key, content.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.css.is_empty() && self.js.is_empty()
    }

    pub fn css_len(&self) -> usize {
        self.css.len()
    }

    pub fn js_len(&self) -> usize {
        self.js.len()
    }

    /// Merges another bundle in, keeping this bundle's entries on key clashes.
    pub fn extend(&mut self, other: AssetBundle) {
        for (key, content) in other.css {
            self.add(AssetKind::Css, key, content);
        }
        for (key, content) in other.js {
            self.add(AssetKind::Js, key, content);
        }
    }

    fn style_block(&self) -> Option<String> {
        if self.css.is_empty() {
            return None;
        }
        let mut block = String::from("<style data-vetrina-assets=\"css\">\n");
        for (key, content) in &self.css {
            block.push_str(&format!("/* {key} */\n{content}\n"));
        }
        block.push_str("</style>");
        Some(block)
    }

    fn script_block(&self) -> Option<String> {
        if self.js.is_empty() {
            return None;
        }
        let mut block = String::from("<script data-vetrina-assets=\"js\">\n");
        for (key, content) in &self.js {
            block.push_str(&format!("// {key}\n{content}\n"));
        }
        block.push_str("</script>");
        Some(block)
    }

    /// Places styles before `</head>` and scripts before `</body>`, appending
    /// at the end when the document lacks those anchors.
    pub fn inject_into(&self, html: &str) -> String {
        let mut document = html.to_string();
        if let Some(styles) = self.style_block() {
            document = insert_before(&document, "</head>", &styles);
        }
        if let Some(scripts) = self.script_block() {
            document = insert_before(&document, "</body>", &scripts);
        }
        document
    }
}

fn insert_before(document: &str, anchor: &str, block: &str) -> String {
    match document.find(anchor) {
        Some(at) => {
            let mut out = String::with_capacity(document.len() + block.len() + 1);
            out.push_str(&document[..at]);
            out.push_str(block);
            out.push('\n');
            out.push_str(&document[at..]);
            out
        }
        None => format!("{document}\n{block}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_keys_collapse_to_one_entry() {
        let mut bundle = AssetBundle::new();
        bundle.add(AssetKind::Css, "header", ".h { color: red; }");
        bundle.add(AssetKind::Css, "header", ".h { color: red; }");
        bundle.add(AssetKind::Css, "footer", ".f {}");
        assert_eq!(bundle.css_len(), 2);
    }

    #[test]
    fn injection_targets_head_and_body() {
        let mut bundle = AssetBundle::new();
        bundle.add(AssetKind::Css, "s", ".a {}");
        bundle.add(AssetKind::Js, "s", "init();");
        let html = "<html><head></head><body><p>x</p></body></html>";
        let out = bundle.inject_into(html);
        let style_at = out.find("<style").expect("style");
        let head_close = out.find("</head>").expect("head");
        let script_at = out.find("<script").expect("script");
        let body_close = out.find("</body>").expect("body");
        assert!(style_at < head_close);
        assert!(script_at < body_close);
        assert!(head_close < script_at);
    }

    #[test]
    fn missing_anchors_append_at_end() {
        let mut bundle = AssetBundle::new();
        bundle.add(AssetKind::Css, "s", ".a {}");
        let out = bundle.inject_into("<p>fragment</p>");
        assert!(out.starts_with("<p>fragment</p>"));
        assert!(out.contains("<style"));
    }
}
