#![allow(dead_code)]

use estate_verify::{ApiClient, ClientConfig};
use serde_json::{json, Value};
use wiremock::MockServer;

pub const TOKEN: &str = "test-token";

pub fn client(server: &MockServer) -> ApiClient {
    let config = ClientConfig::new(&server.uri())
        .expect("mock server uri")
        .with_token(TOKEN);
    ApiClient::new(config).expect("client build")
}

pub fn property_json(id: &str, status: &str, visibility: &str, updated_at: &str) -> Value {
    json!({
        "id": id,
        "agent_id": "agent-1",
        "title": format!("Listing {id}"),
        "description": null,
        "property_type": "house",
        "transaction_type": "sale",
        "price": 150000.0,
        "verification_status": status,
        "visibility": visibility,
        "admin_feedback": null,
        "locations": [{
            "latitude": 4.05,
            "longitude": 9.70,
            "gps_timestamp": "2026-01-01T09:59:30Z",
            "city": "Douala",
            "country": "Cameroon"
        }],
        "media": [{"id": format!("m-{id}"), "file_url": "https://cdn.example.com/m.jpg", "mime_type": "image/jpeg"}],
        "documents": [{"id": format!("d-{id}"), "document_type": "title_deed", "file_name": "deed.pdf"}],
        "created_at": "2026-01-01T10:00:00Z",
        "updated_at": updated_at
    })
}

pub fn envelope(data: Value) -> Value {
    json!({
        "success": true,
        "message": "OK",
        "data": data,
        "error": null
    })
}

pub fn paged_envelope(items: Vec<Value>, total: u64, page: u64, page_size: u64) -> Value {
    let count = items.len() as u64;
    json!({
        "success": true,
        "message": "OK",
        "data": items,
        "meta": {
            "count": count,
            "total": total,
            "page": page,
            "page_size": page_size,
            "total_pages": total.div_ceil(page_size)
        },
        "error": null
    })
}

pub fn failure(message: &str) -> Value {
    json!({
        "success": false,
        "message": message,
        "data": null,
        "error": message
    })
}

pub fn contains_bytes(haystack: &[u8], needle: &str) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle.as_bytes())
}
