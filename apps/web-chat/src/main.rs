//! Single-page web chat over the hosted model.
//!
//! Run with: cargo run -p web-chat
//!
//! Requires `GEMINI_API_KEY`. Serves http://127.0.0.1:3000 by default;
//! override the bind address with `PALAVER_ADDR`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{Router, extract::State, response::Html, routing::get};
use palaver_model::GeminiClient;
use palaver_session::{DispatchMode, SessionManager};
use palaver_transport::websocket::chat_router;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Credential gate: without a key nothing below runs, so the remote
    // endpoint is never touched.
    let client = match GeminiClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };
    let model_name = client.model().to_string();

    // The web surface has an image picker, so dispatch statelessly.
    let sessions = Arc::new(SessionManager::new(client, DispatchMode::Stateless));

    // Build router
    let app = Router::new()
        .route("/", get(index_handler))
        .with_state(model_name.clone())
        .merge(chat_router(sessions))
        .layer(CorsLayer::permissive());

    // Start server
    let addr: SocketAddr = std::env::var("PALAVER_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse()
        .context("invalid PALAVER_ADDR")?;
    tracing::info!(model = %model_name, "Chat listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind")?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn index_handler(State(model): State<String>) -> Html<String> {
    Html(INDEX_HTML.replace("__MODEL__", &model))
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Palaver Chat</title>
    <style>
        body {
            margin: 0;
            padding: 20px;
            background: #1e1e1e;
            color: #d4d4d4;
            font-family: system-ui, sans-serif;
        }
        h1 { color: #fff; margin-bottom: 4px; }
        .status {
            color: #888;
            font-size: 14px;
            margin-bottom: 10px;
        }
        .connected { color: #4a4; }
        .disconnected { color: #a44; }
        #messages {
            height: calc(100vh - 260px);
            overflow-y: auto;
            border: 1px solid #333;
            border-radius: 6px;
            padding: 12px;
        }
        .msg { margin: 8px 0; white-space: pre-wrap; }
        .msg .who { font-weight: bold; margin-right: 6px; }
        .user .who { color: #6cf; }
        .assistant .who { color: #8c8; }
        .error { color: #e66; margin: 8px 0; }
        form { display: flex; gap: 8px; margin-top: 12px; }
        #prompt {
            flex: 1;
            padding: 8px;
            background: #2a2a2a;
            color: #d4d4d4;
            border: 1px solid #444;
            border-radius: 6px;
        }
        button {
            padding: 8px 14px;
            background: #2a2a2a;
            color: #d4d4d4;
            border: 1px solid #444;
            border-radius: 6px;
            cursor: pointer;
        }
        button:disabled { opacity: 0.5; cursor: default; }
        footer { color: #888; font-size: 13px; margin-top: 10px; }
        footer code { color: #bbb; }
    </style>
</head>
<body>
    <h1>Palaver Chat</h1>
    <div class="status" id="status">Connecting...</div>
    <div id="messages"></div>

    <form id="chat-form">
        <input id="prompt" autocomplete="off" placeholder="Ask me anything..." />
        <input id="image" type="file" accept="image/png,image/jpeg" />
        <button id="send" type="submit">Send</button>
        <button id="clear" type="button">Clear history</button>
    </form>

    <footer>Model: <code>__MODEL__</code> &mdash; fast, conversational responses.</footer>

    <script>
        const messages = document.getElementById('messages');
        const status = document.getElementById('status');
        const form = document.getElementById('chat-form');
        const promptInput = document.getElementById('prompt');
        const imageInput = document.getElementById('image');
        const sendButton = document.getElementById('send');
        const clearButton = document.getElementById('clear');
        let ws;

        function setBusy(busy) {
            sendButton.disabled = busy;
            promptInput.disabled = busy;
        }

        function addMessage(role, text, animate) {
            const div = document.createElement('div');
            div.className = 'msg ' + role;
            const who = document.createElement('span');
            who.className = 'who';
            who.textContent = role === 'user' ? 'You:' : 'Assistant:';
            const body = document.createElement('span');
            div.appendChild(who);
            div.appendChild(body);
            messages.appendChild(div);

            if (animate) {
                // Display-side reveal only: the stored history already has
                // the full reply.
                let shown = 0;
                const timer = setInterval(() => {
                    shown += 1;
                    body.textContent = text.slice(0, shown);
                    messages.scrollTop = messages.scrollHeight;
                    if (shown >= text.length) clearInterval(timer);
                }, 15);
            } else {
                body.textContent = text;
            }
            messages.scrollTop = messages.scrollHeight;
        }

        function addError(text) {
            const div = document.createElement('div');
            div.className = 'error';
            div.textContent = text;
            messages.appendChild(div);
            messages.scrollTop = messages.scrollHeight;
        }

        function connect() {
            const protocol = window.location.protocol === 'https:' ? 'wss:' : 'ws:';
            ws = new WebSocket(`${protocol}//${window.location.host}/ws`);

            ws.onopen = () => {
                status.textContent = 'Connected';
                status.className = 'status connected';
            };

            ws.onclose = () => {
                status.textContent = 'Disconnected - reconnecting...';
                status.className = 'status disconnected';
                setTimeout(connect, 2000);
            };

            ws.onmessage = (event) => {
                const msg = JSON.parse(event.data);
                if (msg.type === 'history') {
                    messages.innerHTML = '';
                    for (const m of msg.messages) addMessage(m.role, m.text, false);
                } else if (msg.type === 'turn') {
                    addMessage(msg.user.role, msg.user.text, false);
                    addMessage(msg.assistant.role, msg.assistant.text, true);
                    setBusy(false);
                } else if (msg.type === 'cleared') {
                    messages.innerHTML = '';
                } else if (msg.type === 'error') {
                    addError(msg.message);
                    setBusy(false);
                }
            };
        }

        form.addEventListener('submit', (event) => {
            event.preventDefault();
            const text = promptInput.value.trim();
            if (!text || !ws || ws.readyState !== WebSocket.OPEN) return;

            const file = imageInput.files[0];
            setBusy(true);
            promptInput.value = '';

            if (file) {
                const reader = new FileReader();
                reader.onload = () => {
                    const data = reader.result.split(',', 2)[1];
                    ws.send(JSON.stringify({
                        type: 'prompt',
                        text,
                        attachment: { mime_type: file.type, data }
                    }));
                    imageInput.value = '';
                };
                reader.readAsDataURL(file);
            } else {
                ws.send(JSON.stringify({ type: 'prompt', text }));
            }
        });

        clearButton.addEventListener('click', () => {
            if (ws && ws.readyState === WebSocket.OPEN) {
                ws.send(JSON.stringify({ type: 'clear' }));
            }
        });

        // Start connection
        connect();
    </script>
</body>
</html>
"#;
