//! Request dispatch.
//!
//! Turns an [`ActionRequest`] into a [`Response`]. The pipeline runs in
//! this order and stops at the first refusal:
//!
//! 1. Actor -- load the acting character.
//! 2. Params -- deserialize the action's input.
//! 3. Cost -- refuse if the actor cannot pay, before any other check.
//! 4. Rules -- [`Action::check_request_is_possible`].
//! 5. Perform -- sizing description, or execution plus debit.
//!
//! Refusals the player can act on become an [`ErrorDescription`]; anything
//! else is returned as a [`DispatchError`].

use rolling_store::Store;
use rolling_types::{
    ActionType, BuildId, Character, CharacterId, ErrorDescription, OfferId, StuffId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actions::{
    Action, BringResourceOnBuild, Direction, FillStuff, MakeDeal, MoveItems, Outcome,
    action_label,
};
use crate::context::EconomyContext;
use crate::error::ActionError;
use crate::quantity::format_quantity;

/// Errors that cannot be shown to the player as a refusal.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The action type needs a target and none was given.
    #[error("action {0:?} requires a target")]
    MissingTarget(ActionType),

    /// An action failed for a reason that is not a game refusal.
    #[error("action failed: {0}")]
    Action(#[from] ActionError),
}

/// A player's request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// What to do.
    pub action_type: ActionType,
    /// Who does it.
    pub actor: CharacterId,
    /// Character, build, stuff or offer the action applies to.
    #[serde(default)]
    pub target: Option<Uuid>,
    /// Action input, accumulated across the dialog.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Answer to an [`ActionRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "body", rename_all = "snake_case")]
pub enum Response {
    /// The action ran or asked for more input.
    Done(Outcome),
    /// The action was refused.
    Refused(ErrorDescription),
}

/// One of the concrete actions, resolved from a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameAction {
    /// Give, take, deposit, drop or pick up.
    Move(MoveItems),
    /// Fill a container.
    Fill(FillStuff),
    /// Bring resources to a build.
    Bring(BringResourceOnBuild),
    /// Accept an offer.
    Deal(MakeDeal),
}

impl GameAction {
    /// Resolve the action a request designates.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MissingTarget`] when the action type needs a
    /// target and the request has none.
    pub fn resolve(action_type: ActionType, target: Option<Uuid>) -> Result<Self, DispatchError> {
        let required = || target.ok_or(DispatchError::MissingTarget(action_type));
        Ok(match action_type {
            ActionType::GiveToCharacter => Self::Move(MoveItems::new(Direction::GiveToCharacter(
                CharacterId::from(required()?),
            ))),
            ActionType::TakeFromCharacter => Self::Move(MoveItems::new(
                Direction::TakeFromCharacter(CharacterId::from(required()?)),
            )),
            ActionType::DepositOnBuild => Self::Move(MoveItems::new(Direction::DepositOnBuild(
                BuildId::from(required()?),
            ))),
            ActionType::TakeFromBuild => Self::Move(MoveItems::new(Direction::TakeFromBuild(
                BuildId::from(required()?),
            ))),
            ActionType::DropOnGround => Self::Move(MoveItems::new(Direction::DropOnGround)),
            ActionType::PickUpFromGround => {
                Self::Move(MoveItems::new(Direction::PickUpFromGround))
            }
            ActionType::FillStuff => Self::Fill(FillStuff::new(StuffId::from(required()?))),
            ActionType::BringResourceOnBuild => {
                Self::Bring(BringResourceOnBuild::new(BuildId::from(required()?)))
            }
            ActionType::MakeDeal => Self::Deal(MakeDeal::new(OfferId::from(required()?))),
        })
    }
}

/// Runs requests against a store.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    context: EconomyContext,
}

impl Dispatcher {
    /// Create a dispatcher.
    pub const fn new(context: EconomyContext) -> Self {
        Self { context }
    }

    /// The context requests run with.
    pub const fn context(&self) -> &EconomyContext {
        &self.context
    }

    /// Run one request.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] for a missing target or a failure that is
    /// not a game refusal, such as an unknown actor.
    pub fn dispatch(
        &self,
        store: &mut dyn Store,
        request: &ActionRequest,
    ) -> Result<Response, DispatchError> {
        let action = GameAction::resolve(request.action_type, request.target)?;
        let actor = store.character(request.actor).map_err(ActionError::from)?;
        let response = match action {
            GameAction::Move(action) => self.run(&action, store, &actor, &request.params),
            GameAction::Fill(action) => self.run(&action, store, &actor, &request.params),
            GameAction::Bring(action) => self.run(&action, store, &actor, &request.params),
            GameAction::Deal(action) => self.run(&action, store, &actor, &request.params),
        }?;

        match &response {
            Response::Done(Outcome::Completed(completion)) => tracing::info!(
                actor = %actor.id,
                action = ?request.action_type,
                cost = %completion.cost,
                "Action performed"
            ),
            Response::Done(Outcome::NeedsMoreInput(_)) => tracing::debug!(
                actor = %actor.id,
                action = ?request.action_type,
                "Action needs more input"
            ),
            Response::Refused(refusal) => tracing::debug!(
                actor = %actor.id,
                action = ?request.action_type,
                title = %refusal.title,
                "Action refused"
            ),
        }
        Ok(response)
    }

    fn run<A: Action>(
        &self,
        action: &A,
        store: &mut dyn Store,
        actor: &Character,
        params: &serde_json::Value,
    ) -> Result<Response, DispatchError> {
        let action_type = action.action_type();
        let params = if params.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            params.clone()
        };
        let input: A::Input = match serde_json::from_value(params) {
            Ok(input) => input,
            Err(e) => {
                let err = ActionError::wrong_input(format!("Invalid parameters ({e})"));
                return refuse(actor, action_type, err);
            }
        };

        if let Some(cost) = action.get_cost(&self.context, &*store, actor, &input)
            && actor.action_points < cost
        {
            let err = ActionError::NotEnoughActionPoints {
                required: cost,
                available: actor.action_points,
            };
            return refuse(actor, action_type, err);
        }

        if let Err(err) = action.check_request_is_possible(&self.context, &*store, actor, &input) {
            return refuse(actor, action_type, err);
        }

        match action.perform(&self.context, store, actor, &input) {
            Ok(outcome) => Ok(Response::Done(outcome)),
            Err(err) => refuse(actor, action_type, err),
        }
    }
}

/// Turn a game refusal into a response, or give back any other error.
fn refuse(
    actor: &Character,
    action_type: ActionType,
    err: ActionError,
) -> Result<Response, DispatchError> {
    let Some(line) = refusal_line(actor, &err) else {
        return Err(err.into());
    };
    Ok(Response::Refused(ErrorDescription {
        title: action_label(action_type).to_owned(),
        lines: vec![line],
        insufficient_action_points: matches!(err, ActionError::NotEnoughActionPoints { .. }),
    }))
}

fn refusal_line(actor: &Character, err: &ActionError) -> Option<String> {
    Some(match err {
        ActionError::Impossible { reason } | ActionError::WrongInput { reason } => reason.clone(),
        ActionError::NotEnoughResource {
            name,
            unit,
            required,
            available,
            ..
        } => format!(
            "Not enough {name}: {} needed, {} available",
            format_quantity(*required, *unit),
            format_quantity(*available, *unit)
        ),
        ActionError::NotEnoughStuff {
            name,
            required,
            available,
            ..
        } => format!("Not enough {name}: {required} needed, {available} available"),
        ActionError::NotEnoughActionPoints {
            required,
            available,
        } => format!(
            "{} does not have enough action points ({available} left, {required} needed)",
            actor.name
        ),
        ActionError::ArithmeticOverflow { .. }
        | ActionError::UnknownResource(_)
        | ActionError::UnknownStuffType(_)
        | ActionError::UnknownBuildType(_)
        | ActionError::Store(_)
        | ActionError::Ledger(_) => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolling_core::GameConfig;
    use rolling_store::{MemoryAffinities, MemoryStore};
    use rolling_types::{GroundPoint, ResourceId, StorageLocation};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn dispatcher() -> Dispatcher {
        let yaml = r"
resources:
  WOOD: { name: Bois, unit: gram }
";
        Dispatcher::new(EconomyContext::new(
            GameConfig::parse(yaml).unwrap_or_default(),
            MemoryAffinities::new(),
        ))
    }

    fn world(action_points: rust_decimal::Decimal) -> (MemoryStore, Character) {
        let alice = Character {
            id: CharacterId::new(),
            name: "Alice".to_owned(),
            action_points,
            vulnerable: false,
            alive: true,
            position: GroundPoint::new(0, 0, 0, 0),
        };
        let mut store = MemoryStore::new();
        store.insert_character(alice.clone());
        assert!(
            store
                .add_resource(
                    &StorageLocation::Inventory(alice.id),
                    &ResourceId::from("WOOD"),
                    dec!(100)
                )
                .is_ok()
        );
        (store, alice)
    }

    #[test]
    fn targeted_action_without_target_is_an_error() {
        let result = GameAction::resolve(ActionType::GiveToCharacter, None);
        assert!(matches!(
            result,
            Err(DispatchError::MissingTarget(ActionType::GiveToCharacter))
        ));
        assert!(GameAction::resolve(ActionType::DropOnGround, None).is_ok());
    }

    #[test]
    fn insufficient_points_refused_before_rules() {
        let (mut store, alice) = world(dec!(0.2));
        let request = ActionRequest {
            action_type: ActionType::PickUpFromGround,
            actor: alice.id,
            target: None,
            params: json!({ "resource_id": "WOOD", "quantity": "1000" }),
        };

        let response = dispatcher().dispatch(&mut store, &request);

        let refusal = match response {
            Ok(Response::Refused(refusal)) => Some(refusal),
            _ => None,
        };
        assert!(refusal.as_ref().is_some_and(|r| r.insufficient_action_points));
        assert_eq!(
            refusal.and_then(|r| r.lines.into_iter().next()),
            Some("Alice does not have enough action points (0.2 left, 0.5 needed)".to_owned())
        );
    }

    #[test]
    fn shortfall_becomes_a_formatted_refusal() {
        let (mut store, alice) = world(dec!(5));
        let request = ActionRequest {
            action_type: ActionType::DropOnGround,
            actor: alice.id,
            target: None,
            params: json!({ "resource_id": "WOOD", "quantity": "2kg" }),
        };

        let response = dispatcher().dispatch(&mut store, &request);

        let line = match response {
            Ok(Response::Refused(refusal)) => refusal.lines.into_iter().next(),
            _ => None,
        };
        assert_eq!(
            line,
            Some("Not enough Bois: 2 kg needed, 100 g available".to_owned())
        );
    }

    #[test]
    fn null_params_ask_for_a_choice() {
        let (mut store, alice) = world(dec!(5));
        let request = ActionRequest {
            action_type: ActionType::DropOnGround,
            actor: alice.id,
            target: None,
            params: serde_json::Value::Null,
        };

        let response = dispatcher().dispatch(&mut store, &request);

        assert!(matches!(
            response,
            Ok(Response::Done(Outcome::NeedsMoreInput(_)))
        ));
    }

    fn refusal_for(
        store: &mut MemoryStore,
        action_type: ActionType,
        actor: CharacterId,
        target: Option<Uuid>,
        params: serde_json::Value,
    ) -> Option<String> {
        let request = ActionRequest {
            action_type,
            actor,
            target,
            params,
        };
        match dispatcher().dispatch(store, &request) {
            Ok(Response::Refused(refusal)) => refusal.lines.into_iter().next(),
            _ => None,
        }
    }

    #[test]
    fn unknown_stuff_in_params_is_refused() {
        let (mut store, alice) = world(dec!(5));
        let line = refusal_for(
            &mut store,
            ActionType::DropOnGround,
            alice.id,
            None,
            json!({ "stuff_id": Uuid::now_v7() }),
        );
        assert_eq!(line.as_deref(), Some("There is no such object"));
    }

    #[test]
    fn unknown_targets_are_refused() {
        let (mut store, alice) = world(dec!(5));
        let cases = [
            (ActionType::GiveToCharacter, "There is no such character"),
            (ActionType::TakeFromBuild, "There is no such build"),
            (ActionType::MakeDeal, "There is no such offer"),
            (ActionType::FillStuff, "There is no such object"),
        ];
        for (action_type, expected) in cases {
            let line = refusal_for(
                &mut store,
                action_type,
                alice.id,
                Some(Uuid::now_v7()),
                serde_json::Value::Null,
            );
            assert_eq!(line.as_deref(), Some(expected), "{action_type:?}");
        }
    }

    #[test]
    fn unknown_actor_is_an_error() {
        let (mut store, _) = world(dec!(5));
        let request = ActionRequest {
            action_type: ActionType::DropOnGround,
            actor: CharacterId::new(),
            target: None,
            params: serde_json::Value::Null,
        };
        assert!(dispatcher().dispatch(&mut store, &request).is_err());
    }
}
