//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when building `Effect::Future` values
//! from async blocks inside reducers.

/// Create an `Effect::Future` from an async block
///
/// The block must evaluate to `Option<Action>`; a `Some` value is fed back
/// into the reducer by the runtime.
///
/// # Example
///
/// ```rust,ignore
/// use catalog_core::async_effect;
///
/// async_effect! {
///     match fetcher.fetch_page(page, limit).await {
///         Ok(cats) => Some(CatListAction::FetchSucceeded { cats }),
///         Err(error) => Some(CatListAction::FetchFailed { error }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create a fire-and-forget `Effect::Future`
///
/// The block runs to completion on the runtime but never produces an
/// action, so its outcome cannot change state. Used for background writes
/// whose failures are only logged.
///
/// # Example
///
/// ```rust,ignore
/// use catalog_core::background_effect;
///
/// background_effect! {
///     if let Err(error) = store.flush().await {
///         tracing::warn!(%error, "flush failed");
///     }
/// }
/// ```
#[macro_export]
macro_rules! background_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move {
                $($body)*
                ::std::option::Option::None
            })
        )
    };
}

#[cfg(test)]
mod tests {
    use crate::effect::Effect;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        PageLoaded { count: usize },
    }

    #[test]
    fn test_async_effect_macro() {
        let effect = async_effect! {
            Some(TestAction::PageLoaded { count: 20 })
        };

        assert!(matches!(effect, Effect::Future(_)));
    }

    #[tokio::test]
    async fn test_async_effect_yields_action() {
        let effect = async_effect! {
            Some(TestAction::PageLoaded { count: 3 })
        };

        let Effect::Future(fut) = effect else {
            unreachable!("async_effect! always builds Effect::Future");
        };
        assert_eq!(fut.await, Some(TestAction::PageLoaded { count: 3 }));
    }

    #[tokio::test]
    async fn test_background_effect_yields_nothing() {
        let effect: Effect<TestAction> = background_effect! {
            let _ = 1 + 1;
        };

        let Effect::Future(fut) = effect else {
            unreachable!("background_effect! always builds Effect::Future");
        };
        assert_eq!(fut.await, None);
    }
}
