//! Development server with live reload
//!
//! Files are served from the output directory. Paths that do not name a file
//! go through the route table, so `/blog/hello`, `/blog/hello/` and
//! `/blog/hello.html` all land on the same generated page, and anything the
//! client router would hand to the not-found component gets `404.html`.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{Request, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tower_http::services::ServeDir;

use crate::commands::build::{rebuild, watch_changes};
use crate::generator::NOT_FOUND_KEY;
use crate::helpers::decode_url;
use crate::router::RouteTable;
use crate::Site;

/// Live reload script injected into HTML pages
const LIVE_RELOAD_SCRIPT: &str = r#"
<script>
(function() {
    var ws = new WebSocket('ws://' + location.host + '/__livereload');
    ws.onmessage = function(msg) {
        if (msg.data === 'reload') {
            location.reload();
        }
    };
    ws.onclose = function() {
        console.log('Live reload disconnected. Attempting to reconnect...');
        setTimeout(function() { location.reload(); }, 1000);
    };
})();
</script>
</body>
"#;

/// Server state
struct ServerState {
    output_dir: PathBuf,
    root: String,
    routes: RwLock<RouteTable>,
    reload_tx: broadcast::Sender<()>,
    live_reload: bool,
}

/// Where a request path ends up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// An existing file below the output directory
    File(PathBuf),
    NotFound,
}

/// Start the development server
pub async fn start(site: &Site, ip: &str, port: u16, watch: bool, open: bool) -> Result<()> {
    let (reload_tx, _) = broadcast::channel::<()>(16);

    let state = Arc::new(ServerState {
        output_dir: site.output_dir.clone(),
        root: site.config.root.clone(),
        routes: RwLock::new(RouteTable::from_config(&site.config)?),
        reload_tx,
        live_reload: watch,
    });

    let app = Router::new()
        .route("/__livereload", get(livereload_handler))
        .fallback(fallback_handler)
        .with_state(state.clone());

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}{}", ip, port, site.config.root);
    println!("Server running at {}", url);
    if watch {
        println!("Live reload enabled. Watching for changes...");
    }
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    if watch {
        let site = site.clone();
        let state = state.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = watch_and_reload(site, state) {
                tracing::error!("File watcher error: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Rebuild on change, swap in the new routes and notify clients
fn watch_and_reload(site: Site, state: Arc<ServerState>) -> Result<()> {
    watch_changes(&site, |changed| {
        println!();
        for path in changed {
            println!("📝 File changed: {}", path.display());
        }

        println!("\n🔄 Regenerating...");
        let result = rebuild(&site).and_then(|fresh| RouteTable::from_config(&fresh.config));
        match result {
            Ok(routes) => {
                if let Ok(mut current) = state.routes.write() {
                    *current = routes;
                }
                println!("✅ Regenerated successfully!");
                let _ = state.reload_tx.send(());
            }
            Err(e) => {
                println!("❌ Generation failed: {}", e);
            }
        }
        ControlFlow::Continue(())
    })
}

/// WebSocket handler for live reload
async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    let reload_rx = state.reload_tx.subscribe();
    ws.on_upgrade(move |socket| handle_livereload_socket(socket, reload_rx))
}

/// Handle WebSocket connection for live reload
async fn handle_livereload_socket(mut socket: WebSocket, mut reload_rx: broadcast::Receiver<()>) {
    tracing::debug!("Live reload client connected");

    loop {
        tokio::select! {
            result = reload_rx.recv() => {
                match result {
                    Ok(_) => {
                        if socket.send(Message::Text("reload".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    tracing::debug!("Live reload client disconnected");
}

/// Path below the site root, or `None` when the request is outside it
fn strip_root<'a>(root: &str, path: &'a str) -> Option<&'a str> {
    let root = root.trim_end_matches('/');
    let rest = path.strip_prefix(root)?;
    if rest.is_empty() {
        Some("/")
    } else if rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Map a request path onto a file in the output directory
pub fn resolve_path(output_dir: &Path, routes: &RouteTable, root: &str, path: &str) -> Resolved {
    let decoded = decode_url(path);
    let Some(rel) = strip_root(root, &decoded) else {
        return Resolved::NotFound;
    };
    if rel.split('/').any(|segment| segment == "..") {
        return Resolved::NotFound;
    }

    let trimmed = rel.trim_matches('/');
    if !trimmed.is_empty() && !rel.ends_with('/') {
        let candidate = output_dir.join(trimmed);
        if candidate.is_file() {
            return Resolved::File(candidate);
        }
        let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
        if last.contains('.') && !last.ends_with(".html") {
            return Resolved::NotFound;
        }
    }

    match routes.resolve(rel) {
        Some(matched) if !matched.not_found => {}
        _ => return Resolved::NotFound,
    }

    let page = trimmed.strip_suffix(".html").unwrap_or(trimmed);
    let page = page.strip_suffix("/index").unwrap_or(page);
    let candidates = if page.is_empty() || page == "index" {
        vec![output_dir.join("index.html")]
    } else {
        vec![
            output_dir.join(format!("{}.html", page)),
            output_dir.join(page).join("index.html"),
        ]
    };

    candidates
        .into_iter()
        .find(|c| c.is_file())
        .map(Resolved::File)
        .unwrap_or(Resolved::NotFound)
}

/// Fallback handler that serves files and injects live reload script
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    mut request: Request<Body>,
) -> Response {
    let path = request.uri().path().to_string();

    let resolved = match state.routes.read() {
        Ok(routes) => resolve_path(&state.output_dir, &routes, &state.root, &path),
        Err(_) => Resolved::NotFound,
    };

    match resolved {
        Resolved::File(file) if is_html(&file) => {
            serve_html(&state, &file, StatusCode::OK).await
        }
        Resolved::File(file) => {
            // Serve static file using tower-http, addressed relative to the output dir
            let relative = file
                .strip_prefix(&state.output_dir)
                .unwrap_or(&file)
                .to_string_lossy()
                .replace('\\', "/");
            let encoded = percent_encoding::utf8_percent_encode(&relative, PATH_SET).to_string();
            match format!("/{}", encoded).parse::<Uri>() {
                Ok(uri) => *request.uri_mut() = uri,
                Err(_) => return (StatusCode::BAD_REQUEST, "Bad path").into_response(),
            }
            let mut service = ServeDir::new(&state.output_dir);
            match service.try_call(request).await {
                Ok(response) => response.into_response(),
                Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
            }
        }
        Resolved::NotFound => {
            tracing::debug!("Not found: {}", path);
            let page = state.output_dir.join(format!("{}.html", NOT_FOUND_KEY));
            serve_html(&state, &page, StatusCode::NOT_FOUND).await
        }
    }
}

/// Characters escaped when turning a file path back into a URI path
const PATH_SET: &percent_encoding::AsciiSet = &percent_encoding::CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn is_html(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "html" || ext == "htm")
        .unwrap_or(false)
}

async fn serve_html(state: &ServerState, file: &Path, status: StatusCode) -> Response {
    match tokio::fs::read_to_string(file).await {
        Ok(content) => {
            let body = if state.live_reload {
                inject_live_reload(&content)
            } else {
                content
            };
            (status, Html(body)).into_response()
        }
        Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// Inject live reload script into HTML content
fn inject_live_reload(html: &str) -> String {
    if html.contains("</body>") {
        html.replacen("</body>", LIVE_RELOAD_SCRIPT, 1)
    } else {
        // If no </body> tag, append to end
        format!("{}{}", html, LIVE_RELOAD_SCRIPT)
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
