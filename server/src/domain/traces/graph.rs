//! Execution graph reconstruction
//!
//! Rebuilds the logical step graph of a trace from span metadata:
//!
//! - `graph.node.id` names the node; spans without it are not part of the graph
//! - `graph.node.parent_ids` (array, or a JSON-encoded array string) lists parents
//! - `graph.node.parent_id` is used when `parent_ids` is absent or empty
//! - `graph.node.type` and `graph.node.display_name` are carried on the node
//!
//! A node may have several parents. Malformed parent data on one span drops
//! that span only.

use rustc_hash::FxHashSet;
use serde_json::{Map, Value as JsonValue};

use crate::data::error::DataError;
use crate::data::traits::SpanRepository;
use crate::data::types::{GraphData, GraphEdge, GraphNode, GraphSpanRow};
use crate::utils::json::scalar_to_string;

const NODE_ID: &str = "graph.node.id";
const NODE_PARENT_ID: &str = "graph.node.parent_id";
const NODE_PARENT_IDS: &str = "graph.node.parent_ids";
const NODE_TYPE: &str = "graph.node.type";
const NODE_DISPLAY_NAME: &str = "graph.node.display_name";

/// Load a trace's spans and reconstruct its execution graph
pub async fn load_graph(
    repo: &dyn SpanRepository,
    trace_id: &str,
) -> Result<GraphData, DataError> {
    let rows = repo.list_graph_spans(trace_id).await?;
    Ok(build_graph(&rows))
}

/// Build the graph from spans in start-time order.
///
/// Duplicate node ids keep the first span; edges are unique per `(source, target)`.
pub fn build_graph(rows: &[GraphSpanRow]) -> GraphData {
    let mut graph = GraphData::default();
    let mut seen_nodes = FxHashSet::default();
    let mut seen_edges = FxHashSet::default();

    for row in rows {
        let Some(metadata) = parse_metadata(row) else {
            continue;
        };
        let Some(node_id) = metadata.get(NODE_ID).and_then(scalar_to_string) else {
            continue;
        };
        let parents = match resolve_parents(&metadata) {
            Ok(parents) => parents,
            Err(reason) => {
                tracing::debug!(
                    span_id = %row.span_id,
                    node_id = %node_id,
                    reason,
                    "Skipping graph node with malformed parent ids"
                );
                continue;
            }
        };

        if seen_nodes.insert(node_id.clone()) {
            graph.nodes.push(GraphNode {
                id: node_id.clone(),
                node_type: metadata.get(NODE_TYPE).and_then(scalar_to_string),
                display_name: metadata.get(NODE_DISPLAY_NAME).and_then(scalar_to_string),
                span_id: row.span_id.clone(),
                span_name: row.span_name.clone(),
            });
        }

        for parent in parents {
            let edge = GraphEdge {
                source: parent,
                target: node_id.clone(),
            };
            if seen_edges.insert(edge.clone()) {
                graph.edges.push(edge);
            }
        }
    }

    graph
}

fn parse_metadata(row: &GraphSpanRow) -> Option<Map<String, JsonValue>> {
    let raw = row.metadata.as_deref()?;
    match serde_json::from_str::<JsonValue>(raw) {
        Ok(JsonValue::Object(map)) => Some(map),
        _ => None,
    }
}

/// Parent node ids of one span, or the reason they could not be read
fn resolve_parents(metadata: &Map<String, JsonValue>) -> Result<Vec<String>, &'static str> {
    let from_list = match metadata.get(NODE_PARENT_IDS) {
        None | Some(JsonValue::Null) => Vec::new(),
        Some(JsonValue::Array(items)) => ids_from_array(items)?,
        Some(JsonValue::String(s)) if s.trim().is_empty() => Vec::new(),
        Some(JsonValue::String(s)) => match serde_json::from_str::<JsonValue>(s) {
            Ok(JsonValue::Array(items)) => ids_from_array(&items)?,
            Ok(_) => return Err("parent_ids is not an array"),
            Err(_) => return Err("parent_ids is not valid JSON"),
        },
        Some(_) => return Err("parent_ids has an unsupported type"),
    };

    if !from_list.is_empty() {
        return Ok(from_list);
    }

    Ok(metadata
        .get(NODE_PARENT_ID)
        .and_then(scalar_to_string)
        .into_iter()
        .collect())
}

fn ids_from_array(items: &[JsonValue]) -> Result<Vec<String>, &'static str> {
    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        match item {
            JsonValue::String(s) if s.is_empty() => {}
            JsonValue::String(s) => ids.push(s.clone()),
            JsonValue::Number(n) => ids.push(n.to_string()),
            _ => return Err("parent_ids contains a non-scalar entry"),
        }
    }
    Ok(ids)
}
