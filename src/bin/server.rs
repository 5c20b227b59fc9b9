#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;
#[cfg(not(target_arch = "wasm32"))]
use std::io::{Cursor, Read};
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};
#[cfg(not(target_arch = "wasm32"))]
use std::{env, fs};
#[cfg(not(target_arch = "wasm32"))]
use terramino::highscore::{env_report, HighScoreService, HighScoreStore, MemoryStore, RedisStore};
#[cfg(not(target_arch = "wasm32"))]
use tiny_http::{Header, Request, Response, Server, StatusCode};

#[cfg(not(target_arch = "wasm32"))]
const BANNER: &str = "Terramino - falling block demo\n";

/// Serves the game page plus the score and debug endpoints.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug, Clone)]
struct Opts {
    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to listen on
    #[arg(long, env = "TERRAMINO_PORT", default_value_t = 8080)]
    port: u16,
    /// Directory holding index.html and the wasm bundle
    #[arg(long, default_value = "web")]
    web_root: PathBuf,
    /// Name reported on /env
    #[arg(long, env = "APP_NAME", default_value = "terramino")]
    app_name: String,
    /// Redis host; the high score stays in memory unless host and port are set
    #[arg(long, env = "REDIS_HOST")]
    redis_host: Option<String>,
    #[arg(long, env = "REDIS_PORT")]
    redis_port: Option<u16>,
    #[arg(long, env = "REDIS_PASSWORD", hide_env_values = true)]
    redis_password: Option<String>,
}

#[cfg(not(target_arch = "wasm32"))]
impl Opts {
    fn store(&self) -> Box<dyn HighScoreStore> {
        match (&self.redis_host, self.redis_port) {
            (Some(host), Some(port)) => {
                println!("High scores in redis at {}:{}", host, port);
                Box::new(RedisStore::new(
                    host.clone(),
                    port,
                    self.redis_password.clone(),
                ))
            }
            _ => {
                println!("High scores in memory (set REDIS_HOST and REDIS_PORT for redis)");
                Box::new(MemoryStore::new())
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    let root = if opts.web_root.is_absolute() {
        opts.web_root.clone()
    } else {
        env::current_dir()?.join(&opts.web_root)
    };
    let root = if root.is_dir() {
        Some(root)
    } else {
        eprintln!(
            "web directory not found at {}, serving endpoints only",
            root.display()
        );
        None
    };

    let mut scores = HighScoreService::new(opts.store());
    let addr = format!("{}:{}", opts.host, opts.port);
    let server = Server::http(&addr).map_err(|e| anyhow::anyhow!("bind {}: {}", addr, e))?;
    println!("Terramino server is running on http://{}", addr);

    for mut request in server.incoming_requests() {
        let url = request.url().to_string();
        let method = request.method().to_string();
        let path = url.split('?').next().unwrap_or("/").to_string();
        let status = match path.as_str() {
            "/score" => {
                let mut body = String::new();
                if let Err(e) = request.as_reader().read_to_string(&mut body) {
                    eprintln!("reading body of {} {}: {}", method, url, e);
                }
                let reply = scores.handle(&method, &body);
                respond_text(request, reply.status, reply.body)
            }
            "/env" => respond_text(request, 200, env_report(env::vars(), &opts.app_name)),
            "/redis" => respond_text(request, 200, scores.redis_report()),
            _ => serve_static(request, root.as_deref(), &path),
        };
        println!("{} {} -> {}", method, url, status);
    }
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn respond_text(request: Request, status: u16, body: String) -> u16 {
    let mut resp = Response::from_string(body).with_status_code(StatusCode(status));
    if let Ok(h) = Header::from_bytes("Content-Type", "text/plain; charset=utf-8") {
        resp.add_header(h);
    }
    if let Err(e) = request.respond(resp) {
        eprintln!("respond failed: {}", e);
    }
    status
}

#[cfg(not(target_arch = "wasm32"))]
fn serve_static(request: Request, root: Option<&Path>, url: &str) -> u16 {
    let Some(root) = root else {
        if url == "/" {
            return respond_text(request, 200, BANNER.to_string());
        }
        let _ = request.respond(not_found_response());
        return 404;
    };
    let Some(path) = sanitize_path(root, url) else {
        let _ = request.respond(not_found_response());
        return 404;
    };
    match fs::File::open(&path) {
        Ok(file) => {
            let mime = content_type_for(&path);
            let mut resp = Response::from_file(file).with_status_code(StatusCode(200));
            if let Ok(h) = Header::from_bytes("Content-Type", mime.as_bytes()) {
                resp.add_header(h);
            }
            let _ = request.respond(resp);
            200
        }
        Err(_) => {
            let _ = request.respond(not_found_response());
            404
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn sanitize_path(root: &Path, url: &str) -> Option<PathBuf> {
    let rel = if url == "/" { "index.html" } else { url.trim_start_matches('/') };
    if rel.split('/').any(|part| part == "..") {
        return None;
    }
    let full = root.join(rel);
    let path = if full.is_dir() {
        full.join("index.html")
    } else {
        full
    };
    if path.exists() && path.starts_with(root) {
        Some(path)
    } else {
        None
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "html" => "text/html; charset=utf-8",
        "js" => "application/javascript",
        "css" => "text/css",
        "wasm" => "application/wasm",
        "json" => "application/json",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn not_found_response() -> Response<Cursor<Vec<u8>>> {
    Response::from_string("Not Found").with_status_code(StatusCode(404))
}
