//! # Generic Processor Trait
//!
//! This module defines the `Processor<I, O>` trait, the contract every
//! push-style transformer in the pipeline follows. Input is pushed with
//! `process`, and `finish` marks the end of one unit of input (one fragment
//! for a remuxer), flushing anything still buffered.
//!
//! Both methods emit through the `output` callback synchronously, inside the
//! caller's turn. Callers rely on this: everything a processor produces for a
//! unit of input has been delivered by the time `finish` returns.
//!

use crate::PipelineError;

/// A push-style processor turning items of type `I` into zero or more `O`.
///
/// A processor may hold partial input between `process` calls, but after
/// `finish` returns it must hold nothing from the finished unit, so the next
/// `process` call starts from a clean state.
pub trait Processor<I, O = I> {
    /// Push one input item, emitting any outputs it completes.
    ///
    /// # Arguments
    ///
    /// * `input` - The input data item to process
    /// * `output` - A mutable function that accepts produced items
    fn process(
        &mut self,
        input: I,
        output: &mut dyn FnMut(O) -> Result<(), PipelineError>,
    ) -> Result<(), PipelineError>;

    /// Signal the end of the current unit of input and flush buffered output.
    fn finish(
        &mut self,
        output: &mut dyn FnMut(O) -> Result<(), PipelineError>,
    ) -> Result<(), PipelineError>;

    /// Get the name of this processor for logging and debugging.
    fn name(&self) -> &'static str;
}
