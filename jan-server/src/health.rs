//! `GET /healthz` (spec §6).

pub async fn healthz() -> &'static str {
    "ok"
}
