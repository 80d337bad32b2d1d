//! WebSocket message transport
//!
//! Every text frame is a [`MessageFrame`](quire_core::guard::message::MessageFrame)
//! authorized on its own. The `token` query parameter of the upgrade request is
//! the connection credential, used for frames that carry no token. When the
//! guard refreshes it, the replacement is kept for the rest of the connection.

use axum::{
	extract::{
		Query, State,
		ws::{Message, WebSocket, WebSocketUpgrade},
	},
	response::Response,
};
use serde::Deserialize;

use quire_core::guard::message::dispatch;

use crate::prelude::*;

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
	token: Option<String>,
}

pub async fn get_ws(
	ws: WebSocketUpgrade,
	State(app): State<App>,
	Query(query): Query<WsQuery>,
) -> Response {
	debug!(authenticated = query.token.is_some(), "WebSocket upgrade");
	ws.on_upgrade(move |socket| handle_socket(socket, app, query.token))
}

async fn handle_socket(mut socket: WebSocket, app: App, mut token: Option<String>) {
	while let Some(msg) = socket.recv().await {
		let msg = match msg {
			Ok(msg) => msg,
			Err(err) => {
				debug!("WebSocket receive error: {}", err);
				break;
			}
		};

		match msg {
			Message::Text(text) => {
				let dispatched = match dispatch(&app, token.as_deref(), text.as_str()).await {
					Ok(dispatched) => dispatched,
					Err(err) => {
						warn!("Cannot dispatch message: {}", err);
						continue;
					}
				};
				if let Some(refreshed) = dispatched.conn_token {
					debug!("WebSocket connection token refreshed");
					token = Some(refreshed.into());
				}
				if let Err(err) = socket.send(Message::Text(dispatched.reply.into())).await {
					debug!("WebSocket send error: {}", err);
					break;
				}
			}
			Message::Close(_) => break,
			// Pings are answered by axum
			_ => {}
		}
	}
	debug!("WebSocket closed");
}

// vim: ts=4
