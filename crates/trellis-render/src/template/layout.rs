//! Layout composition.
//!
//! A layout is an ordinary template that pulls the requested view in through
//! three placeholder functions:
//!
//! | Function | Output |
//! |----------|--------|
//! | `content()` | the rendered view |
//! | `render(anything)` | the rendered view; the argument is ignored |
//! | `section(name)` | the rendered `<view stem>-<name>` template, or nothing |
//!
//! ```text
//! layouts/base.html   <html><body>{{ content() }}</body><footer>{{ section("footer") }}</footer></html>
//! index.html          <p>{{ title }}</p>
//! index-footer.html   <small>{{ title }}</small>
//! ```
//!
//! The bindings are created per render and passed in the render context, which
//! shadows the empty placeholders installed in the shared environment. The
//! compiled templates are never mutated, so concurrent renders of different
//! views cannot see each other's bindings.
//!
//! Inside the view only `section` is bound; `content` and `render` stay empty
//! so a view cannot include itself. Section templates see the data alone.
//!
//! # Data fields named like a placeholder
//!
//! The placeholder names always resolve to functions. An object field called
//! `content`, `section` or `render` is not spread into the context; read it
//! through `data` instead (`{{ data.content }}`). `data` holds the whole render
//! data unless the object has a field of that name itself.

use std::collections::BTreeMap;
use std::sync::Arc;

use minijinja::value::{Rest, Value};
use minijinja::Error;

use super::store::Namespace;
use crate::error::RenderError;
use crate::functions::is_reserved;

/// Joins a view's stem and a section name.
pub const SECTION_SEPARATOR: &str = "-";

/// Renders views, optionally wrapped in a layout.
#[derive(Debug, Clone)]
pub struct LayoutRenderer {
    extension: Arc<str>,
}

impl LayoutRenderer {
    /// `extension` is stripped from view names when deriving section names.
    pub fn new(extension: &str) -> Self {
        Self {
            extension: Arc::from(extension),
        }
    }

    /// Renders `view` with `data`, wrapped in `layout` unless it is empty.
    ///
    /// # Errors
    ///
    /// - [`RenderError::TemplateNotFound`] if the layout is missing, or if no
    ///   layout is used and the view is missing
    /// - any execution error raised by the layout, view or a section
    ///
    /// A missing view under a layout is not an error: the layout renders with
    /// empty placeholders.
    pub fn render(
        &self,
        namespace: &Arc<Namespace>,
        view: &str,
        data: &serde_json::Value,
        layout: &str,
    ) -> Result<String, RenderError> {
        if layout.is_empty() {
            return namespace.render(view, &build_context(data, Vec::new()));
        }

        if !namespace.contains(layout) {
            return Err(RenderError::TemplateNotFound(layout.to_string()));
        }

        let ctx = if namespace.contains(view) {
            ViewBinding {
                namespace: Arc::clone(namespace),
                view: Arc::from(view),
                extension: Arc::clone(&self.extension),
                data: Arc::new(data.clone()),
            }
            .layout_context()
        } else {
            tracing::debug!(view, layout, "view not compiled, layout renders without it");
            build_context(data, Vec::new())
        };

        namespace.render(layout, &ctx)
    }

    /// Candidate template names for `section` of `view`, in lookup order.
    pub fn section_candidates(&self, view: &str, section: &str) -> Vec<String> {
        section_candidates(view, section, &self.extension)
    }
}

/// `index.html` + `footer` gives `index-footer`, then `index-footer.html`.
pub(crate) fn section_candidates(view: &str, section: &str, extension: &str) -> Vec<String> {
    let stem = view.strip_suffix(extension).unwrap_or(view);
    let derived = format!("{}{}{}", stem, SECTION_SEPARATOR, section);
    if derived.ends_with(extension) {
        vec![derived]
    } else {
        let with_ext = format!("{}{}", derived, extension);
        vec![derived, with_ext]
    }
}

/// Per-render state captured by the placeholder closures.
#[derive(Clone)]
struct ViewBinding {
    namespace: Arc<Namespace>,
    view: Arc<str>,
    extension: Arc<str>,
    data: Arc<serde_json::Value>,
}

impl ViewBinding {
    fn content(&self) -> Result<Value, Error> {
        let out = self
            .namespace
            .environment()
            .get_template(&self.view)?
            .render(self.view_context())?;
        Ok(Value::from_safe_string(out))
    }

    fn section(&self, name: &str) -> Result<Value, Error> {
        let found = section_candidates(&self.view, name, &self.extension)
            .into_iter()
            .find(|candidate| self.namespace.contains(candidate));

        match found {
            Some(section) => {
                let out = self
                    .namespace
                    .environment()
                    .get_template(&section)?
                    .render(build_context(&self.data, Vec::new()))?;
                Ok(Value::from_safe_string(out))
            }
            None => Ok(Value::from_safe_string(String::new())),
        }
    }

    fn section_fn(&self) -> Value {
        let binding = self.clone();
        Value::from_function(move |name: String| binding.section(&name))
    }

    /// Context for the view itself: data plus `section`.
    fn view_context(&self) -> Value {
        build_context(&self.data, vec![("section", self.section_fn())])
    }

    /// Context for the layout: data plus all three placeholders.
    fn layout_context(&self) -> Value {
        let content = {
            let binding = self.clone();
            Value::from_function(move || binding.content())
        };
        let render = {
            let binding = self.clone();
            Value::from_function(move |_ignored: Rest<Value>| binding.content())
        };

        build_context(
            &self.data,
            vec![
                ("content", content),
                ("section", self.section_fn()),
                ("render", render),
            ],
        )
    }
}

/// Merges render data and bindings into one context map.
///
/// Object data contributes its fields, minus the placeholder names. Non-null
/// data is also exposed whole as `data`, unless an object field already took
/// that name. Placeholder names left unbound here fall through to the empty
/// globals.
fn build_context(data: &serde_json::Value, bindings: Vec<(&str, Value)>) -> Value {
    let mut ctx: BTreeMap<String, Value> = BTreeMap::new();
    match data {
        serde_json::Value::Object(fields) => {
            for (key, value) in fields {
                if is_reserved(key) {
                    tracing::debug!(field = %key, "data field named like a placeholder, reachable as data.*");
                    continue;
                }
                ctx.insert(key.clone(), Value::from_serialize(value));
            }
            ctx.entry("data".to_string())
                .or_insert_with(|| Value::from_serialize(data));
        }
        serde_json::Value::Null => {}
        other => {
            ctx.insert("data".to_string(), Value::from_serialize(other));
        }
    }
    for (name, value) in bindings {
        ctx.insert(name.to_string(), value);
    }
    Value::from_serialize(&ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::functions::FunctionRegistry;
    use crate::template::store::TemplateStore;
    use proptest::prelude::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn namespace(files: &[(&str, &str)]) -> (TempDir, Arc<Namespace>) {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let config = EngineConfig::new(dir.path(), ".html");
        let store = TemplateStore::new(&config, FunctionRegistry::new()).unwrap();
        let namespace = store.get_or_compile().unwrap();
        (dir, namespace)
    }

    #[test]
    fn test_section_candidates() {
        assert_eq!(
            section_candidates("index.html", "footer", ".html"),
            vec!["index-footer", "index-footer.html"]
        );
        assert_eq!(
            section_candidates("user/list.html", "side.html", ".html"),
            vec!["user/list-side.html"]
        );
        assert_eq!(
            section_candidates("plain", "nav", ".html"),
            vec!["plain-nav", "plain-nav.html"]
        );
    }

    #[test]
    fn test_layout_wraps_view() {
        let (_dir, ns) = namespace(&[
            ("index.html", "<p>{{ title }}</p>"),
            ("layouts/base.html", "<html>{{ content() }}</html>"),
        ]);
        let renderer = LayoutRenderer::new(".html");
        let out = renderer
            .render(&ns, "index.html", &json!({"title": "Hi"}), "layouts/base.html")
            .unwrap();
        assert_eq!(out, "<html><p>Hi</p></html>");
    }

    #[test]
    fn test_render_alias_ignores_argument() {
        let (_dir, ns) = namespace(&[
            ("index.html", "body"),
            ("base.html", "[{{ render('whatever') }}]"),
        ]);
        let out = LayoutRenderer::new(".html")
            .render(&ns, "index.html", &json!({}), "base.html")
            .unwrap();
        assert_eq!(out, "[body]");
    }

    #[test]
    fn test_section_from_layout_and_view() {
        let (_dir, ns) = namespace(&[
            ("index.html", "<main>{{ section('aside') }}</main>"),
            ("index-aside.html", "<aside>{{ who }}</aside>"),
            ("index-footer.html", "<small>{{ who }}</small>"),
            ("base.html", "{{ content() }}{{ section('footer') }}"),
        ]);
        let out = LayoutRenderer::new(".html")
            .render(&ns, "index.html", &json!({"who": "me"}), "base.html")
            .unwrap();
        assert_eq!(
            out,
            "<main><aside>me</aside></main><small>me</small>"
        );
    }

    #[test]
    fn test_missing_section_is_empty() {
        let (_dir, ns) = namespace(&[
            ("index.html", "x"),
            ("base.html", "<{{ section('footer') }}>"),
        ]);
        let out = LayoutRenderer::new(".html")
            .render(&ns, "index.html", &json!({}), "base.html")
            .unwrap();
        assert_eq!(out, "<>");
    }

    #[test]
    fn test_missing_layout_is_not_found() {
        let (_dir, ns) = namespace(&[("index.html", "x")]);
        let err = LayoutRenderer::new(".html")
            .render(&ns, "index.html", &json!({}), "layouts/nope.html")
            .unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound(name) if name == "layouts/nope.html"));
    }

    #[test]
    fn test_missing_view_under_layout_renders_empty_content() {
        let (_dir, ns) = namespace(&[("base.html", "<html>{{ content() }}</html>")]);
        let out = LayoutRenderer::new(".html")
            .render(&ns, "ghost.html", &json!({}), "base.html")
            .unwrap();
        assert_eq!(out, "<html></html>");
    }

    #[test]
    fn test_missing_view_without_layout_is_not_found() {
        let (_dir, ns) = namespace(&[]);
        let err = LayoutRenderer::new(".html")
            .render(&ns, "ghost.html", &json!({}), "")
            .unwrap_err();
        assert!(matches!(err, RenderError::TemplateNotFound(_)));
    }

    #[test]
    fn test_view_cannot_include_itself() {
        let (_dir, ns) = namespace(&[
            ("index.html", "a{{ content() }}b"),
            ("base.html", "[{{ content() }}]"),
        ]);
        let out = LayoutRenderer::new(".html")
            .render(&ns, "index.html", &json!({}), "base.html")
            .unwrap();
        assert_eq!(out, "[ab]");
    }

    #[test]
    fn test_view_markup_is_not_escaped_twice() {
        let (_dir, ns) = namespace(&[
            ("index.html", "<em>{{ text }}</em>"),
            ("base.html", "{{ content() }}"),
        ]);
        let out = LayoutRenderer::new(".html")
            .render(&ns, "index.html", &json!({"text": "<b>"}), "base.html")
            .unwrap();
        assert_eq!(out, "<em>&lt;b&gt;</em>");
    }

    #[test]
    fn test_view_error_propagates_through_layout() {
        let (_dir, ns) = namespace(&[
            ("index.html", "{{ nope() }}"),
            ("base.html", "{{ content() }}"),
        ]);
        let result = LayoutRenderer::new(".html").render(&ns, "index.html", &json!({}), "base.html");
        assert!(result.is_err());
    }

    #[test]
    fn test_non_object_data_is_exposed_as_data() {
        let (_dir, ns) = namespace(&[("list.html", "{% for x in data %}{{ x }}{% endfor %}")]);
        let out = LayoutRenderer::new(".html")
            .render(&ns, "list.html", &json!([1, 2, 3]), "")
            .unwrap();
        assert_eq!(out, "123");
    }

    #[test]
    fn test_content_field_does_not_hide_placeholder_without_layout() {
        let (_dir, ns) = namespace(&[("post.html", "[{{ content() }}|{{ data.content }}]")]);
        let out = LayoutRenderer::new(".html")
            .render(&ns, "post.html", &json!({"content": "body text"}), "")
            .unwrap();
        assert_eq!(out, "[|body text]");
    }

    #[test]
    fn test_reserved_fields_stay_reachable_under_layout() {
        let (_dir, ns) = namespace(&[
            ("post.html", "<p>{{ data.content }}</p>{{ section('nav') }}"),
            ("post-nav.html", "<nav>{{ data.section }}</nav>"),
            ("base.html", "{{ content() }}|{{ data.render }}|{{ title }}"),
        ]);
        let data = json!({"content": "text", "section": "news", "render": "r", "title": "T"});
        let out = LayoutRenderer::new(".html")
            .render(&ns, "post.html", &data, "base.html")
            .unwrap();
        assert_eq!(out, "<p>text</p><nav>news</nav>|r|T");
    }

    #[test]
    fn test_data_field_wins_over_whole_data() {
        let (_dir, ns) = namespace(&[("index.html", "{{ data }}")]);
        let out = LayoutRenderer::new(".html")
            .render(&ns, "index.html", &json!({"data": "own"}), "")
            .unwrap();
        assert_eq!(out, "own");
    }

    proptest! {
        #[test]
        fn prop_first_candidate_joins_stem_and_section(
            stem in "[a-z]{1,8}(/[a-z]{1,8}){0,2}",
            section in "[a-z]{1,8}",
        ) {
            let view = format!("{}.html", stem);
            let candidates = section_candidates(&view, &section, ".html");
            prop_assert_eq!(&candidates[0], &format!("{}-{}", stem, section));
            prop_assert!(candidates.last().unwrap().ends_with(".html"));
        }
    }
}
