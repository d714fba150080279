//! Investigation tree: hypothesis nodes and the store that holds them.
//!
//! - [`Node`]: one hypothesis with immutable identity and mutable verdict
//! - [`InvestigationTree`]: node table, adjacency, filters and path queries
//! - [`PortableTree`]: flat `{name, root_id, nodes, edges}` persistence form

mod node;
mod store;


pub use node::*;
pub use store::*;
