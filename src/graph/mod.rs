// SPDX-License-Identifier: MIT
// Dependency graph subsystem.
//
// Exposes:
//   - model — Project, Repository, Dependency, RepoKind, RepoStatus
//   - store — GraphStore (in-memory projects, repos, edges, generations)

pub mod model;
pub mod store;
