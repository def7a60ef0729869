pub mod api;

pub use api::{EntryKind, GitHubClient, RepoEntry, RepositorySource};
