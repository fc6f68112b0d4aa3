//! The middle-end in order: declared types, binding, inference,
//! specialization, lifting, optional materialization, handoff check.

use spl_ast::Module;
use spl_lower::{Backend, LiftStats, MonoStats};
use spl_typeck::{InferStats, TypeError};
use spl_types::TypeRegistry;
use tracing::{debug, info};

use crate::config::PipelineOptions;
use crate::error::CompileError;

/// Counters gathered along the way.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub infer: InferStats,
    pub mono: MonoStats,
    pub lift: LiftStats,
    /// References rewritten into register nodes; zero when disabled.
    pub materialized: usize,
}

/// A module that went through the whole middle-end.
#[derive(Debug)]
pub struct Compiled {
    pub registry: TypeRegistry,
    pub stats: PipelineStats,
}

/// Run every middle-end pass over `module`, in place.
///
/// On success the module's emitted functions are ready for
/// [`hand_off`](spl_lower::hand_off) (verified, unless the options say
/// otherwise). On failure the module is left part-way and should be
/// discarded.
#[tracing::instrument(level = "info", skip_all, fields(module = %module.name))]
pub fn compile_unit(module: &mut Module, options: &PipelineOptions) -> Result<Compiled, CompileError> {
    let registry = TypeRegistry::from_decls(&module.types).map_err(TypeError::from)?;
    spl_typeck::bind_module(module)?;
    let infer = spl_typeck::infer_module(module, &registry)?;

    let mono = if options.monomorphize {
        spl_lower::monomorphize(module)?
    } else {
        debug!("monomorphization disabled");
        MonoStats::default()
    };
    let lift = spl_lower::lift_module(module, options.capture_order)?;
    let materialized = if options.materialize_locals {
        spl_lower::materialize_locals(module)
    } else {
        0
    };
    if options.verify_handoff {
        spl_lower::verify_handoff(module)?;
    }

    let stats = PipelineStats {
        infer,
        mono,
        lift,
        materialized,
    };
    info!(
        functions = module.emitted_items().count(),
        specializations = stats.mono.specializations,
        lifted = stats.lift.lifted,
        "middle-end complete"
    );
    Ok(Compiled { registry, stats })
}

/// [`compile_unit`], then give the result to `backend`.
pub fn compile_to<B: Backend>(
    module: &mut Module,
    options: &PipelineOptions,
    backend: &mut B,
) -> Result<(Compiled, Vec<B::Value>), CompileError> {
    let compiled = compile_unit(module, options)?;
    let handles = spl_lower::hand_off(module, backend)?
        .into_iter()
        .map(|(_, handle)| handle)
        .collect();
    Ok((compiled, handles))
}
