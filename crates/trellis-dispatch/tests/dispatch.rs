use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use serde::Serialize;
use tempfile::TempDir;
use trellis_dispatch::{
    render, set_layout, view, DispatchError, RequestContext, ResponseTransport, StatusCode,
    HTML_CONTENT_TYPE,
};
use trellis_render::Engine;

/// A host request type carrying its own extension map and a byte sink.
#[derive(Default)]
struct FakeRequest {
    extensions: HashMap<String, String>,
    sent: Vec<(u16, String, String)>,
    closed: bool,
}

impl RequestContext for FakeRequest {
    fn get_value(&self, key: &str) -> Option<&str> {
        self.extensions.get(key).map(String::as_str)
    }

    fn set_value(&mut self, key: &str, value: String) {
        self.extensions.insert(key.to_string(), value);
    }
}

impl ResponseTransport for FakeRequest {
    fn send(&mut self, status: StatusCode, content_type: &str, body: Vec<u8>) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"));
        }
        self.sent.push((
            status.as_u16(),
            content_type.to_string(),
            String::from_utf8(body).unwrap(),
        ));
        Ok(())
    }
}

#[derive(Serialize)]
struct User {
    name: String,
}

fn write(dir: &Path, relative_path: &str, content: &str) {
    let full_path = dir.join(relative_path);
    if let Some(parent) = full_path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(full_path, content).unwrap();
}

fn site() -> (TempDir, Engine) {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "user/show.html", "<h1>{{ name }}</h1>");
    write(dir.path(), "user/show-nav.html", "<nav>{{ name }}</nav>");
    write(
        dir.path(),
        "layouts/base.html",
        "<body>{{ section('nav') }}{{ content() }}</body>",
    );
    write(dir.path(), "layouts/admin.html", "<admin>{{ content() }}</admin>");
    let engine = Engine::builder(dir.path(), ".html")
        .default_layout("layouts/base.html")
        .build()
        .unwrap();
    (dir, engine)
}

fn alice() -> User {
    User {
        name: "alice".into(),
    }
}

#[test]
fn view_uses_default_layout_when_none_set() {
    let (_dir, engine) = site();
    let mut req = FakeRequest::default();

    view(&engine, &mut req, "user/show.html", &alice()).unwrap();

    assert_eq!(
        req.sent,
        vec![(
            200,
            HTML_CONTENT_TYPE.to_string(),
            "<body><nav>alice</nav><h1>alice</h1></body>".to_string()
        )]
    );
}

#[test]
fn request_layout_overrides_default() {
    let (_dir, engine) = site();
    let mut req = FakeRequest::default();

    set_layout(&mut req, "layouts/admin.html");
    render(&engine, &mut req, StatusCode::CREATED, "user/show.html", &alice()).unwrap();

    assert_eq!(req.sent[0].0, 201);
    assert_eq!(req.sent[0].2, "<admin><h1>alice</h1></admin>");
}

#[test]
fn empty_request_layout_renders_bare_view() {
    let (_dir, engine) = site();
    let mut req = FakeRequest::default();

    set_layout(&mut req, "");
    view(&engine, &mut req, "user/show.html", &alice()).unwrap();

    assert_eq!(req.sent[0].2, "<h1>alice</h1>");
}

#[test]
fn unknown_layout_sends_server_error() {
    let (_dir, engine) = site();
    let mut req = FakeRequest::default();

    set_layout(&mut req, "layouts/gone.html");
    let result = view(&engine, &mut req, "user/show.html", &alice());

    assert!(matches!(result, Err(DispatchError::Render(_))));
    assert_eq!(req.sent.len(), 1);
    assert_eq!(req.sent[0].0, 500);
}

#[test]
fn transport_failure_is_reported() {
    let (_dir, engine) = site();
    let mut req = FakeRequest {
        closed: true,
        ..FakeRequest::default()
    };

    let result = view(&engine, &mut req, "user/show.html", &alice());
    assert!(matches!(result, Err(DispatchError::Transport(_))));
}

#[test]
fn render_error_survives_closed_transport() {
    let (_dir, engine) = site();
    let mut req = FakeRequest {
        closed: true,
        ..FakeRequest::default()
    };

    set_layout(&mut req, "layouts/gone.html");
    let result = view(&engine, &mut req, "user/show.html", &alice());

    match result {
        Err(DispatchError::Render(err)) => assert!(err.to_string().contains("layouts/gone.html")),
        other => panic!("expected render error, got {other:?}"),
    }
    assert!(req.sent.is_empty());
}

#[test]
fn requests_on_many_threads_share_one_engine() {
    let (_dir, engine) = site();
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let mut req = FakeRequest::default();
                if i % 2 == 0 {
                    set_layout(&mut req, "layouts/admin.html");
                }
                let user = User {
                    name: format!("user{}", i),
                };
                view(&engine, &mut req, "user/show.html", &user).unwrap();
                (i, req.sent.remove(0).2)
            })
        })
        .collect();

    for handle in handles {
        let (i, body) = handle.join().unwrap();
        if i % 2 == 0 {
            assert_eq!(body, format!("<admin><h1>user{i}</h1></admin>"));
        } else {
            assert_eq!(body, format!("<body><nav>user{i}</nav><h1>user{i}</h1></body>"));
        }
    }
}
