use axum::{
    body::Body,
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION, SET_COOKIE},
        Response as HttpResponse, StatusCode,
    },
    response::Response,
};
use exchange_gate::{safe_next_path, GATE_PATH};
use exchange_protocol::{serialize_json, ApiResponse};

pub(crate) fn error_response(code: &str, message: String) -> ApiResponse {
    let hint = match code {
        "invalid_request" => Some(
            "Check the query string or JSON body against GET /api/capabilities.".to_string(),
        ),
        "misconfigured" => Some(
            "The gate password or signing secret is missing; check the server environment."
                .to_string(),
        ),
        _ => None,
    };
    ApiResponse::error(code, message, hint)
}

pub(crate) fn build_response(
    status: StatusCode,
    response: &ApiResponse,
) -> Result<Response, StatusCode> {
    let bytes = serialize_json(response)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_bytes();

    Ok(HttpResponse::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .expect("valid HTTP response"))
}

pub(crate) fn html_response(status: StatusCode, html: String) -> Response {
    HttpResponse::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .header(CACHE_CONTROL, "no-store")
        .body(Body::from(html))
        .expect("valid HTTP response")
}

/// 303 to `location`, optionally rewriting the gate cookie on the way.
pub(crate) fn see_other(location: &str, set_cookie: Option<&str>) -> Response {
    let mut builder = HttpResponse::builder()
        .status(StatusCode::SEE_OTHER)
        .header(LOCATION, location)
        .header(CACHE_CONTROL, "no-store");
    if let Some(cookie) = set_cookie {
        builder = builder.header(SET_COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("valid HTTP response")
}

/// The one response every denied protected request gets.
pub(crate) fn redirect_to_gate(path_and_query: &str) -> Response {
    see_other(&gate_location(path_and_query), None)
}

pub(crate) fn gate_location(path_and_query: &str) -> String {
    let next = safe_next_path(Some(path_and_query));
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{GATE_PATH}?next={encoded}")
}
