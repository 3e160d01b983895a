//! Hook dispatch for AgentSwarm
//!
//! Collects matching registrations from the supplied registries, stable-sorts
//! by priority descending, and invokes them sequentially. The first steering
//! result ends dispatch. Callback errors become `Halt` and emit a
//! `callback_error` log event.

use tracing::warn;

use crate::events::{now, EventCollector, LogEvent};

use super::{HookContext, HookRegistry, HookResult};

/// Dispatch `ctx.event` through the given registries.
///
/// Registries are consulted in order (swarm defaults first, then per-agent);
/// the sort is stable, so equal priorities keep that order.
pub async fn dispatch(
    registries: &[&HookRegistry],
    ctx: &mut HookContext,
    collector: &EventCollector,
) -> HookResult {
    let target = ctx.matcher_target().map(|t| t.to_string());
    let mut registrations = Vec::new();
    for registry in registries {
        registrations.extend(registry.matching(ctx.event, target.as_deref()));
    }
    registrations.sort_by_key(|r| std::cmp::Reverse(r.priority));

    for registration in registrations {
        let outcome = registration.callback.invoke(ctx).await;
        match outcome {
            Ok(HookResult::Continue) => continue,
            Ok(HookResult::Reprompt(prompt)) => {
                if ctx.event == super::HookEvent::SwarmStop {
                    return HookResult::Reprompt(prompt);
                }
                warn!(event = %ctx.event, "Reprompt returned outside swarm_stop; halting");
                return HookResult::Halt(
                    "Reprompt is only valid for swarm_stop hooks".to_string(),
                );
            }
            Ok(steering) => return steering,
            Err(e) => {
                warn!(event = %ctx.event, error = %e, "Hook callback failed");
                collector.emit(LogEvent::CallbackError {
                    timestamp: now(),
                    agent: ctx.agent.clone(),
                    event: ctx.event.as_str().to_string(),
                    error_message: e.to_string(),
                });
                return HookResult::Halt(e.to_string());
            }
        }
    }
    HookResult::Continue
}
