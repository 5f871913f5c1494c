//! # Catalog Core
//!
//! Core traits and types for the cat catalog list architecture.
//!
//! This crate provides the abstractions shared by every layer of the
//! catalog: the Reducer pattern used by the list state machine, the effect
//! descriptions it returns, the data model for cats and breeds, and the two
//! ports (remote fetch and local persistence) the state machine talks to.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state for a list scope
//! - **Action**: All possible inputs to a reducer (user intents and port results)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies (clock, fetch port, persistence port)
//!
//! ## Example
//!
//! ```ignore
//! use catalog_core::*;
//!
//! impl Reducer for CatListReducer {
//!     type State = ListState;
//!     type Action = CatListAction;
//!     type Environment = CatListEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut ListState,
//!         action: CatListAction,
//!         env: &CatListEnvironment,
//!     ) -> SmallVec<[Effect<CatListAction>; 4]> {
//!         // State transitions go here
//!         SmallVec::new()
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Declarative macros for building effects
pub mod effect_macros;

/// Cat and breed data model
pub mod model;

/// Remote fetch and persistence ports
pub mod ports;

/// Reducer module - The core trait for state transitions
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They hold every state transition of a feature and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for CatListReducer {
    ///     type State = ListState;
    ///     type Action = CatListAction;
    ///     type Environment = CatListEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut ListState,
    ///         action: CatListAction,
    ///         env: &CatListEnvironment,
    ///     ) -> SmallVec<[Effect<CatListAction>; 4]> {
    ///         match action {
    ///             CatListAction::DismissError => {
    ///                 state.error_alert = None;
    ///                 SmallVec::new()
    ///             }
    ///             _ => SmallVec::new(),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Updates `state` in place and returns descriptions of the side
        /// effects the runtime should execute. Most actions produce zero or
        /// one effect, so the effects live inline in a `SmallVec`.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects sequentially, each one finishing before the next starts
        Sequential(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Number of leaf effects, flattening `Sequential`
        ///
        /// `Effect::None` counts as zero.
        #[must_use]
        pub fn leaf_count(&self) -> usize {
            match self {
                Effect::None => 0,
                Effect::Future(_) => 1,
                Effect::Sequential(effects) => {
                    effects.iter().map(Effect::leaf_count).sum()
                },
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter. The ports the list state machine uses
/// live in [`crate::ports`]; this module holds the general-purpose ones.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Production - uses system clock
    /// let clock = SystemClock;
    ///
    /// // Test - fixed time for deterministic tests
    /// let clock = FixedClock::new(time);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time source
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
