//! One-time authorization callback listener
//!
//! Serves a tiny HTTP endpoint during first-time authorization: `/`
//! redirects the browser to the Spotify authorize URL and `/callback`
//! receives the authorization code. The listener serves a bounded number of
//! requests and then gives up, returning `None`.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

pub const SCOPES: &str =
    "user-read-currently-playing user-read-playback-state user-modify-playback-state user-library-modify";

const AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
const LISTEN_ADDR: &str = "0.0.0.0:80";
const MAX_SERVED_REQUESTS: u32 = 5;

pub fn authorize_url(client_id: &str, redirect_uri: &str) -> String {
    format!(
        "{AUTHORIZE_URL}?client_id={client_id}&response_type=code&redirect_uri={redirect_uri}&scope={SCOPES}"
    )
    .replace(' ', "%20")
}

/// Bind the well-known port and wait for the browser to deliver a code.
pub async fn get_authorization_code(
    client_id: &str,
    redirect_uri: &str,
) -> Result<Option<String>> {
    let listener = TcpListener::bind(LISTEN_ADDR).await?;
    tracing::info!(addr = LISTEN_ADDR, "authorization listener started");
    serve_authorization_code(listener, &authorize_url(client_id, redirect_uri)).await
}

/// Serve until a callback arrives or the request cap is reached.
pub async fn serve_authorization_code(
    listener: TcpListener,
    login_url: &str,
) -> Result<Option<String>> {
    for _served in 0..MAX_SERVED_REQUESTS {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!(%peer, "client connected");

        match handle_client(stream, login_url).await {
            Ok(Served::Callback(code)) => return Ok(code),
            Ok(Served::Other) => {}
            Err(e) => tracing::warn!(error = %e, "failed to serve auth request"),
        }
    }

    tracing::warn!("request cap reached without a callback");
    Ok(None)
}

enum Served {
    /// Callback path reached; the code is absent when the user denied access.
    Callback(Option<String>),
    Other,
}

async fn handle_client(mut stream: TcpStream, login_url: &str) -> Result<Served> {
    let path = read_request_path(&mut stream).await?;
    tracing::debug!(path = %path.as_deref().unwrap_or("<none>"), "request");

    match path.as_deref() {
        Some(path) if path.starts_with("/callback") && path.contains('?') => {
            let query = path.split_once('?').map(|(_, q)| q).unwrap_or_default();
            let code = query_param(query, "code");
            if code.is_some() {
                respond(
                    &mut stream,
                    "200 OK",
                    "text/html",
                    "<html><head><title>Login complete</title></head><body>Login complete, this page can now be closed</body></html>\r\n",
                )
                .await?;
            } else {
                tracing::warn!(error = %query_param(query, "error").unwrap_or_default(), "callback reports error");
                respond(
                    &mut stream,
                    "200 OK",
                    "text/html",
                    "<html><head><title>Login error</title></head><body>Login failed</body></html>\r\n",
                )
                .await?;
            }
            Ok(Served::Callback(code))
        }
        Some("/") => {
            respond(
                &mut stream,
                "200 OK",
                "text/html",
                &format!(
                    "<head><title>Redirect to login</title><meta http-equiv=\"Refresh\" content=\"0; URL={login_url}\"></head>"
                ),
            )
            .await?;
            Ok(Served::Other)
        }
        _ => {
            respond(&mut stream, "404 Not Found", "text/plain", "Not Found\r\n").await?;
            Ok(Served::Other)
        }
    }
}

/// Read the request head and return the path of the GET request line.
async fn read_request_path(stream: &mut TcpStream) -> Result<Option<String>> {
    let mut reader = BufReader::new(stream);
    let mut request_path = None;
    let mut line = String::new();

    loop {
        line.clear();
        let read = reader.read_line(&mut line).await?;
        if read == 0 || line == "\r\n" || line == "\n" {
            break;
        }
        if let Some(rest) = line.strip_prefix("GET ") {
            request_path = rest.split_whitespace().next().map(str::to_string);
        }
    }

    Ok(request_path)
}

fn query_param(query: &str, name: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name && !value.is_empty()).then(|| value.to_string())
    })
}

async fn respond(
    stream: &mut TcpStream,
    status: &str,
    content_type: &str,
    body: &str,
) -> Result<()> {
    let response = format!("HTTP/1.0 {status}\r\nContent-type: {content_type}\r\n\r\n{body}");
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}
