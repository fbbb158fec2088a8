//! Label state machine: keypoint graphs, the pending entry and the edit cursor.
//!
//! All operations are validated against the active [`Schema`], which is passed
//! in rather than owned so a schema reload can reset the state in place.

use thiserror::Error;

use crate::model::{
    EdgeSegment, GraphSummary, Keypoint, KeypointGraph, Properties, PropertyType, PropertyValue,
    Schema,
};

/// Reasons a label operation did not apply.
///
/// `GraphFull`, `GraphEmpty`, `GraphNotFull` and `LastGraph` are expected
/// boundary conditions reachable by normal clicking. The rest indicate a
/// caller bug.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LabelError {
    /// Insert on a graph that already has every keypoint
    #[error("Keypoint graph #{graph} is already full")]
    GraphFull { graph: usize },

    /// Pop on a graph with no keypoints
    #[error("Keypoint graph #{graph} is already empty")]
    GraphEmpty { graph: usize },

    /// Next graph requested before the current one is complete
    #[error("Keypoint graph #{graph} is not full yet")]
    GraphNotFull { graph: usize },

    /// Deleting the only graph
    #[error("The last keypoint graph cannot be deleted")]
    LastGraph,

    /// Graph index past the end of the list
    #[error("No keypoint graph #{graph} (have {len})")]
    GraphIndexOutOfRange { graph: usize, len: usize },

    /// Keypoint index past the end of its graph
    #[error("No keypoint #{keypoint} in graph #{graph} (have {len})")]
    KeypointIndexOutOfRange {
        graph: usize,
        keypoint: usize,
        len: usize,
    },

    /// Property key not present on the target
    #[error("Unknown property '{key}'")]
    UnknownProperty { key: String },

    /// NaN or infinite position, which the result file cannot store
    #[error("Keypoint position ({x}, {y}) is not a finite number")]
    NonFinitePosition { x: f64, y: f64 },

    /// NaN or infinite number property
    #[error("Property '{key}' must be a finite number")]
    NonFiniteValue { key: String },

    /// Value of the wrong type for the property
    #[error("Property '{key}' expects a {expected} value, got {found}")]
    PropertyTypeMismatch {
        key: String,
        expected: PropertyType,
        found: PropertyType,
    },
}

impl LabelError {
    /// Whether this is an expected no-op rather than a caller mistake.
    pub fn is_boundary(&self) -> bool {
        matches!(
            self,
            LabelError::GraphFull { .. }
                | LabelError::GraphEmpty { .. }
                | LabelError::GraphNotFull { .. }
                | LabelError::LastGraph
        )
    }
}

/// Property values staged for the next keypoint to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    /// Keypoint index these values were prepared for
    pub index: usize,
    /// The staged values
    pub properties: Properties,
}

impl PendingEntry {
    fn defaults(schema: &Schema, index: usize) -> Self {
        Self {
            index,
            properties: schema.default_properties(index).unwrap_or_default(),
        }
    }
}

/// The ordered keypoint graph list plus insertion and selection cursors.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelState {
    graphs: Vec<KeypointGraph>,
    current_graph: usize,
    selected_keypoint: Option<usize>,
    pending: PendingEntry,
}

impl LabelState {
    /// One empty graph with defaults for keypoint 0.
    pub fn new(schema: &Schema) -> Self {
        Self {
            graphs: vec![KeypointGraph::new()],
            current_graph: 0,
            selected_keypoint: None,
            pending: PendingEntry::defaults(schema, 0),
        }
    }

    /// Rebuild from a restored graph list. An empty list gives a fresh state.
    ///
    /// The cursor lands on the last graph; if that graph is full the pending
    /// entry is prepared for the first keypoint of the next graph.
    pub fn from_graphs(schema: &Schema, graphs: Vec<KeypointGraph>) -> Self {
        if graphs.is_empty() {
            return Self::new(schema);
        }

        let current_graph = graphs.len() - 1;
        let len = graphs[current_graph].len();
        let pending_index = if schema.is_full(len) { 0 } else { len };

        Self {
            graphs,
            current_graph,
            selected_keypoint: None,
            pending: PendingEntry::defaults(schema, pending_index),
        }
    }

    /// Clear back to one empty graph.
    pub fn reset(&mut self, schema: &Schema) {
        *self = Self::new(schema);
        log::debug!("Label state reset");
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// All graphs in order.
    pub fn graphs(&self) -> &[KeypointGraph] {
        &self.graphs
    }

    /// The graph at `graph`, if any.
    pub fn graph(&self, graph: usize) -> Option<&KeypointGraph> {
        self.graphs.get(graph)
    }

    /// The keypoint at `(graph, keypoint)`, if any.
    pub fn keypoint(&self, graph: usize, keypoint: usize) -> Option<&Keypoint> {
        self.graphs.get(graph)?.get(keypoint)
    }

    /// Index of the graph that receives inserts.
    pub fn current_graph(&self) -> usize {
        self.current_graph
    }

    /// Index of the next keypoint to place in the current graph.
    pub fn next_index(&self) -> usize {
        self.graphs[self.current_graph].len()
    }

    /// Whether the current graph has every keypoint.
    pub fn is_current_full(&self, schema: &Schema) -> bool {
        schema.is_full(self.next_index())
    }

    /// Values the next inserted keypoint will receive.
    pub fn pending(&self) -> &PendingEntry {
        &self.pending
    }

    /// The point open for editing, as `(graph, keypoint)`.
    pub fn selection(&self) -> Option<(usize, usize)> {
        self.selected_keypoint.map(|k| (self.current_graph, k))
    }

    /// Total number of placed keypoints.
    pub fn point_count(&self) -> usize {
        self.graphs.iter().map(Vec::len).sum()
    }

    /// Nearest keypoint within `radius` of `(x, y)`.
    pub fn hit_test(&self, x: f64, y: f64, radius: f64) -> Option<(usize, usize)> {
        let radius_sq = radius * radius;
        self.graphs
            .iter()
            .enumerate()
            .flat_map(|(g, graph)| {
                graph
                    .iter()
                    .enumerate()
                    .map(move |(k, kp)| (g, k, kp.distance_sq(x, y)))
            })
            .filter(|&(_, _, d)| d <= radius_sq)
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(g, k, _)| (g, k))
    }

    /// Skeleton edges between placed keypoints.
    pub fn edges(&self, schema: &Schema) -> Vec<EdgeSegment> {
        let mut segments = Vec::new();
        for (g, graph) in self.graphs.iter().enumerate() {
            for (k, kp) in graph.iter().enumerate() {
                for (neighbor, color) in schema.edges_of(k) {
                    let Some(other) = graph.get(neighbor) else {
                        continue;
                    };
                    segments.push(EdgeSegment {
                        graph: g,
                        from: k,
                        to: neighbor,
                        start: (kp.x, kp.y),
                        end: (other.x, other.y),
                        color,
                    });
                }
            }
        }
        segments
    }

    /// Rows for the graph list panel.
    pub fn summaries(&self, schema: &Schema) -> Vec<GraphSummary> {
        let deletable = self.graphs.len() > 1;
        self.graphs
            .iter()
            .enumerate()
            .map(|(index, graph)| GraphSummary {
                index,
                points: graph.len(),
                full: schema.is_full(graph.len()),
                current: index == self.current_graph,
                deletable,
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------

    /// Append the next schema keypoint to the current graph.
    ///
    /// Returns the index of the inserted keypoint.
    pub fn insert_next_point(
        &mut self,
        schema: &Schema,
        x: f64,
        y: f64,
    ) -> Result<usize, LabelError> {
        check_position(x, y)?;
        let graph = self.current_graph;
        let next = self.next_index();
        let Some(entry) = schema.entry(next) else {
            log::info!("Keypoint graph #{} is already FULL", graph);
            return Err(LabelError::GraphFull { graph });
        };

        if self.pending.index != next {
            log::debug!(
                "Pending entry was for keypoint {}, using defaults for {}",
                self.pending.index,
                next
            );
            self.pending = PendingEntry::defaults(schema, next);
        }

        let keypoint = Keypoint::new(entry.name.clone(), x, y, self.pending.properties.clone());
        self.graphs[graph].push(keypoint);
        log::debug!(
            "Inserted keypoint {} ({}) into graph #{} at ({:.1}, {:.1})",
            next,
            entry.name,
            graph,
            x,
            y
        );

        if next + 1 < schema.len() {
            self.pending = PendingEntry::defaults(schema, next + 1);
        }

        Ok(next)
    }

    /// Remove the last keypoint of the current graph.
    ///
    /// Its properties become the pending entry so it can be re-placed as-is.
    pub fn pop_last_point(&mut self) -> Result<Keypoint, LabelError> {
        let graph = self.current_graph;
        let Some(popped) = self.graphs[graph].pop() else {
            log::info!("Keypoint graph #{} is already EMPTY", graph);
            return Err(LabelError::GraphEmpty { graph });
        };

        self.pending = PendingEntry {
            index: self.graphs[graph].len(),
            properties: popped.properties.clone(),
        };
        if self.selected_keypoint == Some(self.graphs[graph].len()) {
            self.selected_keypoint = None;
        }
        log::debug!("Popped keypoint {} from graph #{}", popped.name, graph);

        Ok(popped)
    }

    /// Move on to the following graph, appending one if needed.
    ///
    /// Returns the new current graph index.
    pub fn start_next_graph(&mut self, schema: &Schema) -> Result<usize, LabelError> {
        let graph = self.current_graph;
        if !self.is_current_full(schema) {
            log::info!("Keypoint graph #{} is not full yet", graph);
            return Err(LabelError::GraphNotFull { graph });
        }

        if graph + 1 == self.graphs.len() {
            self.graphs.push(KeypointGraph::new());
        }
        self.current_graph = graph + 1;
        self.selected_keypoint = None;
        self.reset_pending(schema);
        log::debug!(
            "Started keypoint graph #{} ({} graphs)",
            self.current_graph,
            self.graphs.len()
        );

        Ok(self.current_graph)
    }

    /// Make `graph` current, e.g. from a click on its row.
    pub fn select_graph(&mut self, schema: &Schema, graph: usize) -> Result<(), LabelError> {
        self.check_graph(graph)?;
        self.current_graph = graph;
        self.selected_keypoint = None;
        self.reset_pending(schema);
        Ok(())
    }

    /// Overwrite one staged property of the next keypoint.
    pub fn set_pending_property(
        &mut self,
        key: &str,
        value: PropertyValue,
    ) -> Result<(), LabelError> {
        let prop = self
            .pending
            .properties
            .get_mut(key)
            .ok_or_else(|| LabelError::UnknownProperty {
                key: key.to_string(),
            })?;
        check_type(key, prop.kind, &value)?;
        prop.value = value;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// Open `(graph, keypoint)` for editing.
    pub fn select_point(&mut self, graph: usize, keypoint: usize) -> Result<(), LabelError> {
        self.check_keypoint(graph, keypoint)?;
        self.current_graph = graph;
        self.selected_keypoint = Some(keypoint);
        log::debug!("Selected keypoint {} of graph #{}", keypoint, graph);
        Ok(())
    }

    /// Close the point editor.
    pub fn deselect_point(&mut self) {
        self.selected_keypoint = None;
    }

    /// Overwrite a keypoint's position.
    pub fn move_point(
        &mut self,
        graph: usize,
        keypoint: usize,
        x: f64,
        y: f64,
    ) -> Result<(), LabelError> {
        self.check_keypoint(graph, keypoint)?;
        check_position(x, y)?;
        let kp = &mut self.graphs[graph][keypoint];
        kp.x = x;
        kp.y = y;
        Ok(())
    }

    /// Overwrite one property value of a keypoint.
    pub fn set_point_property(
        &mut self,
        graph: usize,
        keypoint: usize,
        key: &str,
        value: PropertyValue,
    ) -> Result<(), LabelError> {
        self.check_keypoint(graph, keypoint)?;
        let prop = self.graphs[graph][keypoint]
            .properties
            .get_mut(key)
            .ok_or_else(|| LabelError::UnknownProperty {
                key: key.to_string(),
            })?;
        check_type(key, prop.kind, &value)?;
        prop.value = value;
        Ok(())
    }

    /// Remove a graph. The list never becomes empty.
    pub fn delete_graph(&mut self, schema: &Schema, graph: usize) -> Result<(), LabelError> {
        self.check_graph(graph)?;
        if self.graphs.len() <= 1 {
            log::info!("Refusing to delete the last keypoint graph");
            return Err(LabelError::LastGraph);
        }

        self.graphs.remove(graph);
        self.current_graph = 0;
        self.selected_keypoint = None;
        self.reset_pending(schema);
        log::debug!("Deleted keypoint graph #{}", graph);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn reset_pending(&mut self, schema: &Schema) {
        let len = self.next_index();
        self.pending = PendingEntry::defaults(schema, if schema.is_full(len) { 0 } else { len });
    }

    fn check_graph(&self, graph: usize) -> Result<(), LabelError> {
        if graph < self.graphs.len() {
            Ok(())
        } else {
            Err(LabelError::GraphIndexOutOfRange {
                graph,
                len: self.graphs.len(),
            })
        }
    }

    fn check_keypoint(&self, graph: usize, keypoint: usize) -> Result<(), LabelError> {
        self.check_graph(graph)?;
        let len = self.graphs[graph].len();
        if keypoint < len {
            Ok(())
        } else {
            Err(LabelError::KeypointIndexOutOfRange {
                graph,
                keypoint,
                len,
            })
        }
    }
}

fn check_type(
    key: &str,
    expected: PropertyType,
    value: &PropertyValue,
) -> Result<(), LabelError> {
    match value {
        _ if value.kind() != expected => Err(LabelError::PropertyTypeMismatch {
            key: key.to_string(),
            expected,
            found: value.kind(),
        }),
        PropertyValue::Number(n) if !n.is_finite() => Err(LabelError::NonFiniteValue {
            key: key.to_string(),
        }),
        _ => Ok(()),
    }
}

fn check_position(x: f64, y: f64) -> Result<(), LabelError> {
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        Err(LabelError::NonFinitePosition { x, y })
    }
}
