//! HTTP/1.1 server side of the gateway.
//!
//! Bodies are never buffered whole: the parser only consumes the head, and
//! whoever handles the request streams the body from the connection.
//!
//! # Architecture
//!
//! - **`connection`**: per-client state machine (read, dispatch, forward/respond, hijack)
//! - **`headers`**: ordered header list with case-insensitive lookup
//! - **`parser`**: request and response head parsing from byte buffers
//! - **`request`**: request head model and body framing
//! - **`response`**: locally generated responses and relayed response heads
//! - **`writer`**: serializes and writes local responses to the client
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for a request head
//!        └──────┬──────┘
//!               │ Head parsed
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Dispatch on path and headers
//!        └──┬─────┬──────┬──┘
//!  local    │     │      │ upgrade on a tunnel route
//!  response │     │      └──────────────► Hijacked (raw relay, then closed)
//!           ▼     │ proxy route
//!   ┌──────────┐  ▼
//!   │ Writing  │ Forwarding ← stream request/response through the backend
//!   └────┬─────┘  │
//!        ├────────┘
//!        ├─ Keep-Alive → Reading (same connection)
//!        └─ Close → Closed
//! ```

pub mod connection;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
