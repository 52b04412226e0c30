//! Three-level grouping of classified records.
//!
//! `environment → application → cluster → {versions}`. Every level is a
//! `BTreeMap` and every leaf a `BTreeSet`, so iteration order is ascending
//! lexicographic at all levels and rendering never sorts on its own.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use syncreport_shared::Classification;

type Clusters = BTreeMap<String, BTreeSet<String>>;
type Applications = BTreeMap<String, Clusters>;

/// Append-only, deduplicating grouping built fresh for every run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Grouping {
    environments: BTreeMap<String, Applications>,
}

/// One leaf of the grouping, borrowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leaf<'a> {
    pub environment: &'a str,
    pub application: &'a str,
    pub cluster: &'a str,
    pub versions: &'a BTreeSet<String>,
}

impl Leaf<'_> {
    /// More than one distinct version for the same cluster.
    pub fn is_drifting(&self) -> bool {
        self.versions.len() > 1
    }
}

impl Grouping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `version` under the classification's keys, creating levels on demand.
    ///
    /// Returns `true` when the version was not already present. Inserting the
    /// same pair again is a no-op.
    pub fn insert(&mut self, classification: &Classification, version: impl Into<String>) -> bool {
        self.environments
            .entry(classification.environment.clone())
            .or_default()
            .entry(classification.application.clone())
            .or_default()
            .entry(classification.cluster.clone())
            .or_default()
            .insert(version.into())
    }

    /// Version set of a single leaf.
    pub fn versions(
        &self,
        environment: &str,
        application: &str,
        cluster: &str,
    ) -> Option<&BTreeSet<String>> {
        self.environments
            .get(environment)?
            .get(application)?
            .get(cluster)
    }

    /// Environment keys in ascending order.
    pub fn environments(&self) -> impl Iterator<Item = &str> {
        self.environments.keys().map(String::as_str)
    }

    /// All leaves of one environment, ordered by application then cluster.
    pub fn leaves_in<'a>(&'a self, environment: &'a str) -> impl Iterator<Item = Leaf<'a>> + 'a {
        self.environments
            .get_key_value(environment)
            .into_iter()
            .flat_map(|(env, apps)| {
                apps.iter().flat_map(move |(app, clusters)| {
                    clusters.iter().map(move |(cluster, versions)| Leaf {
                        environment: env,
                        application: app,
                        cluster,
                        versions,
                    })
                })
            })
    }

    /// All leaves, ordered by environment, application, cluster.
    pub fn leaves(&self) -> impl Iterator<Item = Leaf<'_>> {
        self.environments.keys().flat_map(|env| self.leaves_in(env))
    }

    /// Leaves that carry more than one version.
    pub fn drift(&self) -> Vec<Leaf<'_>> {
        self.leaves().filter(|leaf| leaf.is_drifting()).collect()
    }

    pub fn environment_count(&self) -> usize {
        self.environments.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }
}
