// SPDX-License-Identifier: MIT
// External indexing service integration.
//
// Exposes:
//   - client — IndexerClient seam, SubmitOutcome, HttpIndexerClient, GraphData

pub mod client;
