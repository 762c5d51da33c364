//! Pre-save hooks and post-load routers.
//!
//! Both are "take a profile, return a profile" transforms registered by the
//! host. They differ only in failure handling: a failing pre-save hook is
//! logged and rolled back, a failing load router aborts the load.

use crate::error::{KeepError, Result};
use crate::profile::Profile;

/// Transform run over a profile before it is serialized.
pub trait PreSaveHook {
    /// Stable name used in logs.
    fn name(&self) -> &str;

    fn before_save(&self, profile: Profile) -> anyhow::Result<Profile>;
}

/// Transform run over a profile after it is installed in the profile map.
pub trait LoadRouter {
    fn name(&self) -> &str;

    fn handle_load(&self, profile: Profile) -> anyhow::Result<Profile>;
}

/// Adapts a named closure into a hook or router.
pub struct FnHook<F> {
    name: String,
    f: F,
}

impl<F> FnHook<F>
where
    F: Fn(Profile) -> anyhow::Result<Profile>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Box as a pre-save hook.
    pub fn pre_save(name: impl Into<String>, f: F) -> Box<dyn PreSaveHook>
    where
        F: 'static,
    {
        Box::new(Self::new(name, f))
    }

    /// Box as a load router.
    pub fn router(name: impl Into<String>, f: F) -> Box<dyn LoadRouter>
    where
        F: 'static,
    {
        Box::new(Self::new(name, f))
    }
}

impl<F> PreSaveHook for FnHook<F>
where
    F: Fn(Profile) -> anyhow::Result<Profile>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn before_save(&self, profile: Profile) -> anyhow::Result<Profile> {
        (self.f)(profile)
    }
}

impl<F> LoadRouter for FnHook<F>
where
    F: Fn(Profile) -> anyhow::Result<Profile>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle_load(&self, profile: Profile) -> anyhow::Result<Profile> {
        (self.f)(profile)
    }
}

/// Run pre-save hooks in order.
///
/// Each hook works on its own copy; when it fails, the value from just
/// before that hook carries on to the next one. Returns the transformed
/// profile and the number of hooks that failed.
pub fn run_pre_save(
    hooks: &[Box<dyn PreSaveHook>],
    session_id: &str,
    profile: Profile,
) -> (Profile, usize) {
    let mut current = profile;
    let mut failures = 0;

    for hook in hooks {
        match hook.before_save(current.clone()) {
            Ok(next) => current = next,
            Err(e) => {
                failures += 1;
                tracing::error!(
                    hook = hook.name(),
                    session_id,
                    "pre-save hook failed, keeping previous profile: {:#}",
                    e
                );
            }
        }
    }

    (current, failures)
}

/// Run load routers in order, stopping at the first failure.
pub fn run_load_routers(routers: &[Box<dyn LoadRouter>], profile: Profile) -> Result<Profile> {
    let mut current = profile;
    for router in routers {
        current = router
            .handle_load(current)
            .map_err(|source| KeepError::LoadRouter {
                router: router.name().to_string(),
                source,
            })?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(key: &'static str, value: i64) -> impl Fn(Profile) -> anyhow::Result<Profile> {
        move |mut p: Profile| {
            p.as_value_mut()[key] = json!(value);
            Ok(p)
        }
    }

    #[test]
    fn test_pre_save_runs_in_order() {
        let hooks = vec![
            FnHook::pre_save("first", set("n", 1)),
            FnHook::pre_save("second", set("n", 2)),
        ];
        let (out, failures) = run_pre_save(&hooks, "s1", Profile::empty());
        assert_eq!(out.field("/n"), Some(&json!(2)));
        assert_eq!(failures, 0);
    }

    #[test]
    fn test_pre_save_failure_rolls_back_only_that_hook() {
        let hooks = vec![
            FnHook::pre_save("a", set("a", 1)),
            FnHook::pre_save("broken", |mut p: Profile| {
                p.as_value_mut()["partial"] = json!(true);
                anyhow::bail!("exploded halfway")
            }),
            FnHook::pre_save("c", set("c", 3)),
        ];
        let (out, failures) = run_pre_save(&hooks, "s1", Profile::empty());

        assert_eq!(failures, 1);
        assert_eq!(out.as_value(), &json!({ "a": 1, "c": 3 }));
    }

    #[test]
    fn test_load_router_failure_aborts() {
        let routers = vec![
            FnHook::router("ok", set("x", 1)),
            FnHook::router("bad", |_| anyhow::bail!("nope")),
            FnHook::router("never", set("y", 1)),
        ];
        let err = run_load_routers(&routers, Profile::empty()).unwrap_err();
        match err {
            KeepError::LoadRouter { router, .. } => assert_eq!(router, "bad"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_routers_chain() -> Result<()> {
        let routers = vec![FnHook::router("x", set("x", 1)), FnHook::router("y", set("y", 2))];
        let out = run_load_routers(&routers, Profile::empty())?;
        assert_eq!(out.as_value(), &json!({ "x": 1, "y": 2 }));
        Ok(())
    }
}
