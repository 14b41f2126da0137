//! The context mutation protocol: idempotent-by-identifier edits applied
//! against a [`CoordinatorContext`] value. Every operation is a pure
//! function `(context, payload) -> new context | error` — no I/O, no
//! ambient state. Callers must serialize mutations per user context; the
//! protocol offers no locking or versioning, so interleaved writers get
//! last-writer-wins.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::context::{CoordinatorContext, Goal};
use crate::error::CoreError;
use crate::plan::DailyPlan;
use crate::sessions::WorkoutSession;

/// One edit against the coordinator context.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextOp {
    /// Add a session: to the first plan if one exists, otherwise into a
    /// freshly minted plan dated "now".
    CreateWorkout(WorkoutSession),
    /// Replace the session with the matching id, or append to the first
    /// plan when no session matches.
    UpdateWorkout(WorkoutSession),
    /// Replace the goal with the matching id, or append.
    UpsertGoal(Goal),
    /// Total replace: every field of the aggregate is overwritten. The only
    /// operation that can delete goals or workouts, by omission.
    ReplaceContext(CoordinatorContext),
}

/// Apply one operation. Either fully succeeds with the new context or fully
/// fails leaving `ctx` untouched — no partial application is observable.
/// `now` dates a plan minted by [`ContextOp::CreateWorkout`]; passing it in
/// keeps the protocol a pure function of its inputs.
pub fn apply(
    ctx: &CoordinatorContext,
    op: ContextOp,
    now: DateTime<Utc>,
) -> Result<CoordinatorContext, CoreError> {
    match op {
        ContextOp::CreateWorkout(session) => Ok(create_workout(ctx, session, now)),
        ContextOp::UpdateWorkout(session) => update_workout(ctx, session),
        ContextOp::UpsertGoal(goal) => Ok(upsert_goal(ctx, goal)),
        ContextOp::ReplaceContext(new_ctx) => Ok(replace_context(ctx, new_ctx)),
    }
}

/// Append a session to the first plan, or mint the first plan around it.
pub fn create_workout(
    ctx: &CoordinatorContext,
    session: WorkoutSession,
    now: DateTime<Utc>,
) -> CoordinatorContext {
    let mut next = ctx.clone();
    match next.training_plan.first_mut() {
        Some(first_day) => first_day.sessions.push(session),
        None => next.training_plan.push(DailyPlan {
            tracking_id: Uuid::new_v4(),
            date: now,
            sessions: vec![session],
        }),
    }
    next
}

/// Replace the first session whose id matches, scanning plans in order and
/// sessions in order. No match: append to the first plan. No plans at all:
/// `NoTrainingPlanPresent`.
pub fn update_workout(
    ctx: &CoordinatorContext,
    session: WorkoutSession,
) -> Result<CoordinatorContext, CoreError> {
    if ctx.training_plan.is_empty() {
        return Err(CoreError::NoTrainingPlanPresent);
    }

    let target = ctx.training_plan.iter().enumerate().find_map(|(pi, plan)| {
        plan.sessions
            .iter()
            .position(|s| s.id() == session.id())
            .map(|si| (pi, si))
    });

    let mut next = ctx.clone();
    match target {
        Some((pi, si)) => next.training_plan[pi].sessions[si] = session,
        None => next.training_plan[0].sessions.push(session),
    }
    Ok(next)
}

/// Replace the goal with the matching id in place, preserving list order;
/// append when the id is new.
pub fn upsert_goal(ctx: &CoordinatorContext, goal: Goal) -> CoordinatorContext {
    let mut next = ctx.clone();
    match next.goals.iter().position(|g| g.id == goal.id) {
        Some(idx) => next.goals[idx] = goal,
        None => next.goals.push(goal),
    }
    next
}

/// Field-by-field total overwrite from an already-validated document. Not a
/// pointer swap: each field is individually assigned, so the operation's
/// shape matches its contract — all fields required in, all fields
/// replaced out, never a merge with prior state.
pub fn replace_context(
    ctx: &CoordinatorContext,
    new_ctx: CoordinatorContext,
) -> CoordinatorContext {
    let mut next = ctx.clone();
    next.user_id = new_ctx.user_id;
    next.goals = new_ctx.goals;
    next.training_plan = new_ctx.training_plan;
    next.fitness_levels = new_ctx.fitness_levels;
    next
}

// JSON-level entry points mirroring the agent tool surface: parse the
// payload into the typed form, then apply. On any error the caller's
// context is simply not replaced — nothing is half-applied.

pub fn create_workout_json(
    ctx: &CoordinatorContext,
    payload: &Value,
    now: DateTime<Utc>,
) -> Result<CoordinatorContext, CoreError> {
    let session = WorkoutSession::parse(payload)?;
    Ok(create_workout(ctx, session, now))
}

pub fn update_workout_json(
    ctx: &CoordinatorContext,
    payload: &Value,
) -> Result<CoordinatorContext, CoreError> {
    let session = WorkoutSession::parse(payload)?;
    update_workout(ctx, session)
}

pub fn upsert_goal_json(
    ctx: &CoordinatorContext,
    payload: &Value,
) -> Result<CoordinatorContext, CoreError> {
    let goal = Goal::parse(payload)?;
    Ok(upsert_goal(ctx, goal))
}

pub fn replace_context_json(
    ctx: &CoordinatorContext,
    payload: &Value,
) -> Result<CoordinatorContext, CoreError> {
    let new_ctx = CoordinatorContext::parse(payload)?;
    Ok(replace_context(ctx, new_ctx))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::sessions::ActivityType;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap()
    }

    fn empty_context() -> CoordinatorContext {
        CoordinatorContext::new("Climber@Example.Com", vec![], vec![], vec![])
    }

    fn session(description: &str) -> WorkoutSession {
        WorkoutSession::parse(&json!({
            "activity": "running",
            "sessionDescription": description,
            "distanceKm": 8,
            "heartRate": 145,
            "elevationGain": 60,
            "paceMinPerKm": 315
        }))
        .unwrap()
    }

    fn goal(id: &str, title: &str) -> Goal {
        Goal::parse(&json!({
            "id": id,
            "goalActivity": "running",
            "title": title,
            "description": "10k under 45 minutes",
            "goalDeadline": "2025-11-01T00:00:00Z",
            "isCompleted": false
        }))
        .unwrap()
    }

    #[test]
    fn create_workout_on_empty_plan_mints_one_day() {
        let ctx = empty_context();
        let next = apply(&ctx, ContextOp::CreateWorkout(session("First run")), now()).unwrap();

        assert_eq!(next.training_plan.len(), 1);
        let day = &next.training_plan[0];
        assert_eq!(day.sessions.len(), 1);
        assert_eq!(day.date, now());
        // Input context is untouched.
        assert!(ctx.training_plan.is_empty());
    }

    #[test]
    fn create_workout_appends_to_first_day_only() {
        let ctx = empty_context();
        let ctx = apply(&ctx, ContextOp::CreateWorkout(session("Day one")), now()).unwrap();
        let second_day_ctx = {
            let mut c = ctx.clone();
            c.training_plan.push(DailyPlan {
                tracking_id: Uuid::new_v4(),
                date: now(),
                sessions: vec![session("Day two")],
            });
            c
        };

        let next = apply(
            &second_day_ctx,
            ContextOp::CreateWorkout(session("Extra session")),
            now(),
        )
        .unwrap();

        assert_eq!(next.training_plan[0].sessions.len(), 2);
        assert_eq!(next.training_plan[1], second_day_ctx.training_plan[1]);
        assert_eq!(
            next.training_plan[0].tracking_id,
            second_day_ctx.training_plan[0].tracking_id
        );
    }

    #[test]
    fn update_workout_replaces_matching_session_in_place() {
        let original = session("Before");
        let ctx = apply(&empty_context(), ContextOp::CreateWorkout(original.clone()), now())
            .unwrap();
        let ctx = apply(&ctx, ContextOp::CreateWorkout(session("Neighbor")), now()).unwrap();

        let mut updated = original.clone();
        use crate::sessions::HasDescription;
        updated.set_description("After".to_string());

        let next = apply(&ctx, ContextOp::UpdateWorkout(updated.clone()), now()).unwrap();
        assert_eq!(next.training_plan[0].sessions[0], updated);
        assert_eq!(next.training_plan[0].sessions[1].description(), "Neighbor");
        assert_eq!(next.training_plan[0].sessions.len(), 2);
    }

    #[test]
    fn update_workout_finds_sessions_in_later_plans() {
        let target = session("Target");
        let ctx = apply(&empty_context(), ContextOp::CreateWorkout(session("Day one")), now())
            .unwrap();
        let ctx = {
            let mut c = ctx;
            c.training_plan.push(DailyPlan {
                tracking_id: Uuid::new_v4(),
                date: now(),
                sessions: vec![session("Day two filler"), target.clone()],
            });
            c
        };

        let mut updated = target.clone();
        use crate::sessions::HasDescription;
        updated.set_description("Target v2".to_string());

        let next = apply(&ctx, ContextOp::UpdateWorkout(updated.clone()), now()).unwrap();
        // Replacement lands in the second plan, same slot; plan 0 untouched.
        assert_eq!(next.training_plan[0], ctx.training_plan[0]);
        assert_eq!(next.training_plan[1].sessions[0].description(), "Day two filler");
        assert_eq!(next.training_plan[1].sessions[1], updated);
        assert_eq!(next.training_plan[1].sessions.len(), 2);
    }

    #[test]
    fn update_workout_replaces_only_the_earliest_duplicate() {
        let duplicated = session("Shared");
        let mut ctx = empty_context();
        for _ in 0..2 {
            ctx.training_plan.push(DailyPlan {
                tracking_id: Uuid::new_v4(),
                date: now(),
                sessions: vec![duplicated.clone()],
            });
        }

        let mut updated = duplicated.clone();
        use crate::sessions::HasDescription;
        updated.set_description("Shared v2".to_string());

        let next = apply(&ctx, ContextOp::UpdateWorkout(updated.clone()), now()).unwrap();
        assert_eq!(next.training_plan[0].sessions[0], updated);
        // The later occurrence of the same id is left as it was.
        assert_eq!(next.training_plan[1].sessions[0], duplicated);
    }

    #[test]
    fn update_workout_without_match_appends_to_first_plan() {
        let ctx = apply(&empty_context(), ContextOp::CreateWorkout(session("Existing")), now())
            .unwrap();
        let next = apply(&ctx, ContextOp::UpdateWorkout(session("New one")), now()).unwrap();
        assert_eq!(next.training_plan[0].sessions.len(), 2);
    }

    #[test]
    fn update_workout_with_no_plans_fails_and_preserves_context() {
        let ctx = empty_context();
        let before = ctx.snapshot();
        let err = apply(&ctx, ContextOp::UpdateWorkout(session("Orphan")), now()).unwrap_err();
        assert_eq!(err, CoreError::NoTrainingPlanPresent);
        assert_eq!(ctx.snapshot(), before);
    }

    #[test]
    fn upsert_goal_replaces_by_id_preserving_order() {
        let ctx = empty_context();
        let a = goal("11111111-1111-4111-8111-111111111111", "Goal A");
        let b = goal("22222222-2222-4222-8222-222222222222", "Goal B");
        let ctx = apply(&ctx, ContextOp::UpsertGoal(a.clone()), now()).unwrap();
        let ctx = apply(&ctx, ContextOp::UpsertGoal(b.clone()), now()).unwrap();

        let replacement = goal("11111111-1111-4111-8111-111111111111", "Goal A v2");
        let next = apply(&ctx, ContextOp::UpsertGoal(replacement.clone()), now()).unwrap();

        assert_eq!(next.goals.len(), 2);
        assert_eq!(next.goals[0], replacement);
        assert_eq!(next.goals[1], b);
    }

    #[test]
    fn upsert_goal_appends_new_ids() {
        let ctx = apply(
            &empty_context(),
            ContextOp::UpsertGoal(goal("11111111-1111-4111-8111-111111111111", "Existing")),
            now(),
        )
        .unwrap();
        let next = apply(
            &ctx,
            ContextOp::UpsertGoal(goal("33333333-3333-4333-8333-333333333333", "Fresh")),
            now(),
        )
        .unwrap();
        assert_eq!(next.goals.len(), 2);
        assert_eq!(next.goals[0], ctx.goals[0]);
    }

    #[test]
    fn replace_context_is_total() {
        let ctx = apply(
            &empty_context(),
            ContextOp::UpsertGoal(goal("11111111-1111-4111-8111-111111111111", "Will vanish")),
            now(),
        )
        .unwrap();

        let replacement = crate::context::tests::context_payload();
        let next = replace_context_json(&ctx, &replacement).unwrap();
        assert_eq!(next.user_id, "a1b2c3d4-user");
        // The old goal is gone: replacement is total, never a merge.
        assert_eq!(next.goals.len(), 1);
        assert_eq!(next.goals[0].activity, ActivityType::Climbing);
    }

    #[test]
    fn replace_context_rejects_partial_documents() {
        let ctx = empty_context();
        let mut partial = crate::context::tests::context_payload();
        partial.as_object_mut().unwrap().remove("goals");
        let err = replace_context_json(&ctx, &partial).unwrap_err();
        assert_eq!(
            err,
            CoreError::MissingField {
                variant: "context",
                field: "goals"
            }
        );
    }

    #[test]
    fn json_entry_points_propagate_parse_errors_untouched() {
        let ctx = apply(&empty_context(), ContextOp::CreateWorkout(session("Seed")), now())
            .unwrap();
        let before = ctx.snapshot();

        let err = create_workout_json(&ctx, &json!({"activity": "swimming"}), now()).unwrap_err();
        assert!(matches!(err, CoreError::UnknownActivityVariant { .. }));

        let err = update_workout_json(&ctx, &json!("not an object")).unwrap_err();
        assert!(matches!(err, CoreError::MalformedSessionPayload { .. }));

        let err = upsert_goal_json(&ctx, &json!({"title": "No id"})).unwrap_err();
        assert_eq!(
            err,
            CoreError::MissingField {
                variant: "goal",
                field: "id"
            }
        );

        assert_eq!(ctx.snapshot(), before);
    }
}
