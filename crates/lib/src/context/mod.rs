//! Per-run build context.
//!
//! Every stage reads what earlier stages published and publishes its own
//! result. The context holds at most one object per [`ContextKind`]; asking
//! for an object nobody published is a sequencing error that aborts the run.

use std::fmt;

use thiserror::Error;

use crate::compile::BuildOutput;
use crate::diff::ChangeSet;
use crate::incremental::{IncrementalPlan, PriorManifest};
use crate::manifest::ManifestContext;
use crate::params::{BuildOptionsContext, BuildParametersContext};
use crate::resolve::ResolvedArtifacts;

/// The kinds of object a [`BuildContext`] can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
  BuildParameters,
  BuildOptions,
  ResolvedArtifacts,
  PriorManifest,
  IncrementalPlan,
  BuildOutput,
  Manifest,
  ChangeSet,
}

impl ContextKind {
  pub const ALL: [ContextKind; 8] = [
    ContextKind::BuildParameters,
    ContextKind::BuildOptions,
    ContextKind::ResolvedArtifacts,
    ContextKind::PriorManifest,
    ContextKind::IncrementalPlan,
    ContextKind::BuildOutput,
    ContextKind::Manifest,
    ContextKind::ChangeSet,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      ContextKind::BuildParameters => "build parameters",
      ContextKind::BuildOptions => "build options",
      ContextKind::ResolvedArtifacts => "resolved artifacts",
      ContextKind::PriorManifest => "prior manifest",
      ContextKind::IncrementalPlan => "incremental plan",
      ContextKind::BuildOutput => "build output",
      ContextKind::Manifest => "manifest",
      ContextKind::ChangeSet => "change set",
    }
  }
}

impl fmt::Display for ContextKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Error)]
pub enum ContextError {
  #[error("missing context: {kind} was not published by an earlier stage")]
  Missing { kind: ContextKind },
}

/// A type that lives in exactly one slot of a [`BuildContext`].
pub trait ContextObject: Sized {
  const KIND: ContextKind;

  fn slot(ctx: &BuildContext) -> &Option<Self>;

  fn slot_mut(ctx: &mut BuildContext) -> &mut Option<Self>;
}

/// Typed registry of build-time state. One is created per run.
#[derive(Debug, Default)]
pub struct BuildContext {
  parameters: Option<BuildParametersContext>,
  options: Option<BuildOptionsContext>,
  resolved: Option<ResolvedArtifacts>,
  prior: Option<PriorManifest>,
  plan: Option<IncrementalPlan>,
  output: Option<BuildOutput>,
  manifest: Option<ManifestContext>,
  changes: Option<ChangeSet>,
}

impl BuildContext {
  pub fn new() -> Self {
    Self::default()
  }

  /// Publish `object`, replacing any earlier object of the same kind.
  pub fn set<T: ContextObject>(&mut self, object: T) {
    *T::slot_mut(self) = Some(object);
  }

  pub fn get<T: ContextObject>(&self) -> Result<&T, ContextError> {
    T::slot(self).as_ref().ok_or(ContextError::Missing { kind: T::KIND })
  }

  pub fn get_mut<T: ContextObject>(&mut self) -> Result<&mut T, ContextError> {
    T::slot_mut(self).as_mut().ok_or(ContextError::Missing { kind: T::KIND })
  }

  pub fn contains<T: ContextObject>(&self) -> bool {
    T::slot(self).is_some()
  }

  /// Remove and return the object of kind `T`.
  pub fn take<T: ContextObject>(&mut self) -> Option<T> {
    T::slot_mut(self).take()
  }

  /// Kinds currently published.
  pub fn kinds(&self) -> Vec<ContextKind> {
    let present = [
      self.parameters.is_some(),
      self.options.is_some(),
      self.resolved.is_some(),
      self.prior.is_some(),
      self.plan.is_some(),
      self.output.is_some(),
      self.manifest.is_some(),
      self.changes.is_some(),
    ];
    ContextKind::ALL
      .into_iter()
      .zip(present)
      .filter_map(|(kind, present)| present.then_some(kind))
      .collect()
  }

  pub fn clear(&mut self) {
    *self = Self::default();
  }
}

impl ContextObject for BuildParametersContext {
  const KIND: ContextKind = ContextKind::BuildParameters;

  fn slot(ctx: &BuildContext) -> &Option<Self> {
    &ctx.parameters
  }

  fn slot_mut(ctx: &mut BuildContext) -> &mut Option<Self> {
    &mut ctx.parameters
  }
}

impl ContextObject for BuildOptionsContext {
  const KIND: ContextKind = ContextKind::BuildOptions;

  fn slot(ctx: &BuildContext) -> &Option<Self> {
    &ctx.options
  }

  fn slot_mut(ctx: &mut BuildContext) -> &mut Option<Self> {
    &mut ctx.options
  }
}

impl ContextObject for ResolvedArtifacts {
  const KIND: ContextKind = ContextKind::ResolvedArtifacts;

  fn slot(ctx: &BuildContext) -> &Option<Self> {
    &ctx.resolved
  }

  fn slot_mut(ctx: &mut BuildContext) -> &mut Option<Self> {
    &mut ctx.resolved
  }
}

impl ContextObject for PriorManifest {
  const KIND: ContextKind = ContextKind::PriorManifest;

  fn slot(ctx: &BuildContext) -> &Option<Self> {
    &ctx.prior
  }

  fn slot_mut(ctx: &mut BuildContext) -> &mut Option<Self> {
    &mut ctx.prior
  }
}

impl ContextObject for IncrementalPlan {
  const KIND: ContextKind = ContextKind::IncrementalPlan;

  fn slot(ctx: &BuildContext) -> &Option<Self> {
    &ctx.plan
  }

  fn slot_mut(ctx: &mut BuildContext) -> &mut Option<Self> {
    &mut ctx.plan
  }
}

impl ContextObject for BuildOutput {
  const KIND: ContextKind = ContextKind::BuildOutput;

  fn slot(ctx: &BuildContext) -> &Option<Self> {
    &ctx.output
  }

  fn slot_mut(ctx: &mut BuildContext) -> &mut Option<Self> {
    &mut ctx.output
  }
}

impl ContextObject for ManifestContext {
  const KIND: ContextKind = ContextKind::Manifest;

  fn slot(ctx: &BuildContext) -> &Option<Self> {
    &ctx.manifest
  }

  fn slot_mut(ctx: &mut BuildContext) -> &mut Option<Self> {
    &mut ctx.manifest
  }
}

impl ContextObject for ChangeSet {
  const KIND: ContextKind = ContextKind::ChangeSet;

  fn slot(ctx: &BuildContext) -> &Option<Self> {
    &ctx.changes
  }

  fn slot_mut(ctx: &mut BuildContext) -> &mut Option<Self> {
    &mut ctx.changes
  }
}
