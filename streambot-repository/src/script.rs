//! Traversal scripts issued to the graph backend.
//!
//! The store only ever needs two script shapes, so they are modelled as an
//! enum rather than free-form text. Remote backends render them to Gremlin;
//! the in-memory backend interprets them directly.

use crate::config::{CREATED_AT_KEY, SUBSCRIBE_LABEL};
use crate::types::VertexHandle;

/// A script evaluated by the backend in a single round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraversalScript {
    /// Create a `subscribe` edge `from -> to` carrying `created_at`, unless
    /// such an edge already exists. Check and create run inside the same
    /// script. Evaluates to the existing or newly created edge(s).
    SubscribeIfAbsent {
        from: VertexHandle,
        to: VertexHandle,
        created_at: i64,
    },
    /// Follow outgoing `subscribe` edges from `start` for at most `max_depth`
    /// hops. Evaluates to every vertex visited, each once, excluding `start`.
    /// A bound of 0 is treated as 1.
    FanOut {
        start: VertexHandle,
        max_depth: u32,
    },
}

impl TraversalScript {
    /// Short operation name used in logs and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SubscribeIfAbsent { .. } => "subscribe_if_absent",
            Self::FanOut { .. } => "fan_out",
        }
    }

    /// Render the script as Gremlin 2 (Groovy) text for Rexster's
    /// `/tp/gremlin` extension.
    pub fn render(&self) -> String {
        match self {
            Self::SubscribeIfAbsent {
                from,
                to,
                created_at,
            } => {
                let label = quote(SUBSCRIBE_LABEL);
                format!(
                    "f=g.v({from});t=g.v({to});\
                     x=f.outE({label}).as('e').inV.retain([t]).back('e').toList();\
                     if(x.isEmpty()){{e=g.addEdge(f,t,{label},[{key}:{created_at}]);g.commit();[e]}}\
                     else{{x}}",
                    from = handle_literal(from),
                    to = handle_literal(to),
                    label = label,
                    key = CREATED_AT_KEY,
                    created_at = created_at,
                )
            }
            // `it.loops` is 1 after the first `out`, and the condition is only
            // checked after a step, so `loops<=n` walks exactly n hops (n >= 1).
            Self::FanOut { start, max_depth } => format!(
                "s=g.v({start});s.out({label}).loop(1){{it.loops<={depth}}}{{true}}.dedup.except([s])",
                start = handle_literal(start),
                label = quote(SUBSCRIBE_LABEL),
                depth = (*max_depth).max(1),
            ),
        }
    }
}

fn handle_literal(handle: &VertexHandle) -> String {
    match handle {
        VertexHandle::Numeric(n) => n.to_string(),
        VertexHandle::Text(s) => quote(s),
    }
}

/// Quote a value as a single-quoted Groovy string literal.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '$' => out.push_str("\\$"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
