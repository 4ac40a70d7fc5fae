use super::{Child, Router};
use crate::error::UrlError;
use crate::pattern::fill_template;
use crate::route::Route;
use std::collections::HashSet;

impl Router {
    /// Every route of the tree, in resolution order.
    pub fn routes(&self) -> Vec<&Route> {
        let mut routes = Vec::new();
        self.collect_routes(&mut routes);
        routes
    }

    fn collect_routes<'r>(&'r self, routes: &mut Vec<&'r Route>) {
        for child in &self.children {
            match child {
                Child::Route(route) => routes.push(route),
                Child::Router(router) => router.collect_routes(routes),
            }
        }
    }

    /// The first route registered under `name`.
    pub fn find_route(&self, name: &str) -> Option<&Route> {
        self.children.iter().find_map(|child| match child {
            Child::Route(route) if route.name() == Some(name) => Some(route),
            Child::Route(_) => None,
            Child::Router(router) => router.find_route(name),
        })
    }

    /// Builds the path of the route named `name`.
    ///
    /// Each `:key` placeholder is replaced with the value of `key` in `data`; pairs whose key
    /// is not a placeholder are appended as the query string, in the order given.
    ///
    /// ```
    /// use micro_router::{Context, Router, handler_fn};
    ///
    /// let mut router = Router::new();
    /// let user = router.sub_router("user").unwrap();
    /// user.get(":id", handler_fn(|_ctx: &mut Context| Ok(()))).unwrap().named("user_profile");
    ///
    /// let url = router.url("user_profile", [("id", "42"), ("tab", "posts")]).unwrap();
    /// assert_eq!(url, "/user/42?tab=posts");
    /// ```
    pub fn url<I, K, V>(&self, name: &str, data: I) -> Result<String, UrlError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let route = self.find_route(name).ok_or_else(|| UrlError::UnknownRoute(name.to_string()))?;
        let data: Vec<(String, String)> = data.into_iter().map(|(k, v)| (k.into(), v.into())).collect();

        let mut used = HashSet::new();
        let path = fill_template(route.full_path(), |key| {
            let value = data.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())?;
            used.insert(key.to_string());
            Some(value)
        })
        .map_err(|key| UrlError::missing_param(name, key))?;

        let rest: Vec<_> = data.iter().filter(|(k, _)| !used.contains(k)).collect();
        if rest.is_empty() {
            return Ok(path);
        }
        let query = serde_urlencoded::to_string(rest)?;
        Ok(format!("{path}?{query}"))
    }

    /// One line per route: methods (`ANY` when unrestricted), full path and name.
    pub fn debug(&self) -> Vec<String> {
        self.routes()
            .into_iter()
            .map(|route| {
                let methods = route.allowed_methods();
                let methods = if methods.is_empty() { "ANY".to_string() } else { methods.join("|") };
                format!("{methods:<12} {:<32} {}", route.full_path(), route.name().unwrap_or("<unnamed>"))
            })
            .collect()
    }
}
