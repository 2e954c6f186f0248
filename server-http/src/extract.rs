use abacus::domain::RequestContext;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{HeaderMap, header, request::Parts};
use std::convert::Infallible;
use std::net::SocketAddr;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Caller address and user agent, recorded with every dispatch
#[derive(Debug, Clone, Default)]
pub struct ClientInfo(pub RequestContext);

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(ClientInfo(RequestContext {
            client_ip: forwarded_for(&parts.headers).or(peer),
            user_agent: header_text(&parts.headers, header::USER_AGENT.as_str()),
        }))
    }
}

/// First hop of `X-Forwarded-For`, which is the original client
fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    header_text(headers, X_FORWARDED_FOR)?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .map(str::to_string)
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
