//! Dashboard API Adapter (C9): the HTML dashboard itself is an external,
//! out-of-scope asset (spec.md §1 Out of scope: "the dashboard HTML and
//! its JSON polling are described only at the API boundary"). This crate
//! embeds one placeholder page purely so `-listen` has something to serve
//! at `/`; its content is not a subject of any invariant. The JSON polling
//! surface it talks to is the worker HTTP endpoint in `distributed::worker`.
pub const PLACEHOLDER_HTML: &str = include_str!("dashboard_placeholder.html");
