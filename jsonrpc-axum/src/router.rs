//! Request routing.
//!
//! A [`Router`] maps an inbound request to exactly one [`Handler`] using
//! [`Matcher`]s over the request version and method. Scopes nest: a scope
//! inherits every matcher of its parent, adds its own, and may carry its own
//! default handler for requests that fall inside the scope but match nothing
//! more specific.
//!
//! # Resolution
//!
//! Within a router, resolution tries in order:
//!
//! 1. routes indexed under the exact request method, including exact-method
//!    routes declared in nested scopes
//! 2. every route in declaration order; a scope route descends into its scope
//! 3. the router's default handler
//!
//! A scope that resolves nothing lets its parent continue. If nothing in the
//! tree resolves, the request is answered with `MethodNotFound`.
//!
//! # Example
//!
//! ```
//! use jsonrpc_axum::{Router, method_fn};
//! use jsonrpc_axum_core::ErrorObject;
//!
//! let router = Router::new()
//!     .version("2.0", |v2| {
//!         v2.method_prefix("eth_", |eth| {
//!             eth.method(
//!                 "eth_chainId",
//!                 method_fn(|_: ()| async { Ok::<_, ErrorObject>("0x1") }),
//!             )
//!         })
//!     });
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use jsonrpc_axum_client::BoxFuture;
use jsonrpc_axum_core::RequestMessage;

use crate::handler::{Handler, MethodNotFound};
use crate::response::ResponseWriter;

/// A predicate over the version and method of a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Matcher {
    /// The version equals the given string.
    Version(String),
    /// The method equals the given string.
    Method(String),
    /// The method starts with the given string.
    MethodPrefix(String),
}

impl Matcher {
    pub fn version<S: Into<String>>(version: S) -> Self {
        Matcher::Version(version.into())
    }

    pub fn method<S: Into<String>>(method: S) -> Self {
        Matcher::Method(method.into())
    }

    pub fn method_prefix<S: Into<String>>(prefix: S) -> Self {
        Matcher::MethodPrefix(prefix.into())
    }

    pub fn matches(&self, version: &str, method: &str) -> bool {
        match self {
            Matcher::Version(v) => v == version,
            Matcher::Method(m) => m == method,
            Matcher::MethodPrefix(p) => method.starts_with(p.as_str()),
        }
    }
}

enum Target {
    Handler(Arc<dyn Handler>),
    Scope(Router),
}

/// An ordered list of matchers, all of which must pass, and what they lead to.
pub struct Route {
    matchers: Vec<Matcher>,
    target: Target,
}

impl Route {
    /// The full matcher chain, including every matcher inherited from
    /// enclosing scopes.
    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    pub fn matches(&self, version: &str, method: &str) -> bool {
        self.matchers.iter().all(|m| m.matches(version, method))
    }

    fn resolve(&self, version: &str, method: &str) -> Option<&dyn Handler> {
        if !self.matches(version, method) {
            return None;
        }
        match &self.target {
            Target::Handler(handler) => Some(handler.as_ref()),
            Target::Scope(router) => router.find(version, method),
        }
    }

    /// The exact method this route is pinned to, if any.
    fn exact_method(&self) -> Option<&str> {
        self.matchers.iter().find_map(|m| match m {
            Matcher::Method(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let target = match self.target {
            Target::Handler(_) => "handler",
            Target::Scope(_) => "scope",
        };
        f.debug_struct("Route")
            .field("matchers", &self.matchers)
            .field("target", &target)
            .finish()
    }
}

/// Routes requests to handlers.
///
/// Built once, then immutable; resolution takes `&self` and needs no
/// synchronization.
#[derive(Default)]
pub struct Router {
    chain: Vec<Matcher>,
    routes: Vec<Arc<Route>>,
    index: HashMap<String, Vec<Arc<Route>>>,
    default: Option<Arc<dyn Handler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle requests that reach this router but match none of its routes.
    pub fn default_handler<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.default = Some(Arc::new(handler));
        self
    }

    /// Route requests for the exact method `name` to `handler`.
    pub fn method<S, H>(self, name: S, handler: H) -> Self
    where
        S: Into<String>,
        H: Handler + 'static,
    {
        self.route([Matcher::method(name)], handler)
    }

    /// Route requests passing every matcher to `handler`.
    ///
    /// The route also inherits the matchers of this router's scope.
    pub fn route<I, H>(mut self, matchers: I, handler: H) -> Self
    where
        I: IntoIterator<Item = Matcher>,
        H: Handler + 'static,
    {
        let route = Route {
            matchers: self.extend_chain(matchers),
            target: Target::Handler(Arc::new(handler)),
        };
        self.push(Arc::new(route));
        self
    }

    /// Open a nested scope narrowed by `matchers`.
    ///
    /// `build` receives an empty router that inherits this router's matcher
    /// chain; exact-method routes it declares are indexed here as well.
    pub fn scope<I, F>(mut self, matchers: I, build: F) -> Self
    where
        I: IntoIterator<Item = Matcher>,
        F: FnOnce(Router) -> Router,
    {
        let chain = self.extend_chain(matchers);
        let scope = build(Router {
            chain: chain.clone(),
            ..Router::default()
        });

        for (method, routes) in &scope.index {
            self.index
                .entry(method.clone())
                .or_default()
                .extend(routes.iter().cloned());
        }
        self.routes.push(Arc::new(Route {
            matchers: chain,
            target: Target::Scope(scope),
        }));
        self
    }

    /// Open a scope for one protocol version.
    pub fn version<S, F>(self, version: S, build: F) -> Self
    where
        S: Into<String>,
        F: FnOnce(Router) -> Router,
    {
        self.scope([Matcher::version(version)], build)
    }

    /// Open a scope for a method namespace such as `"eth_"`.
    pub fn method_prefix<S, F>(self, prefix: S, build: F) -> Self
    where
        S: Into<String>,
        F: FnOnce(Router) -> Router,
    {
        self.scope([Matcher::method_prefix(prefix)], build)
    }

    /// The matchers every route of this router inherits.
    pub fn matchers(&self) -> &[Matcher] {
        &self.chain
    }

    /// Resolve the handler for `request`.
    ///
    /// Never fails: when nothing matches, the handler answers
    /// `MethodNotFound`.
    pub fn resolve(&self, request: &RequestMessage) -> &dyn Handler {
        match self.find(request.version(), request.method()) {
            Some(handler) => handler,
            None => {
                tracing::debug!(
                    rpc.method = %request.method(),
                    rpc.version = %request.version(),
                    "no route matched"
                );
                &MethodNotFound
            }
        }
    }

    fn find(&self, version: &str, method: &str) -> Option<&dyn Handler> {
        if let Some(candidates) = self.index.get(method) {
            if let Some(handler) = candidates.iter().find_map(|r| r.resolve(version, method)) {
                return Some(handler);
            }
        }
        if let Some(handler) = self.routes.iter().find_map(|r| r.resolve(version, method)) {
            return Some(handler);
        }
        self.default.as_deref()
    }

    fn extend_chain<I: IntoIterator<Item = Matcher>>(&self, matchers: I) -> Vec<Matcher> {
        let mut chain = self.chain.clone();
        chain.extend(matchers);
        chain
    }

    fn push(&mut self, route: Arc<Route>) {
        if let Some(method) = route.exact_method() {
            self.index
                .entry(method.to_owned())
                .or_default()
                .push(route.clone());
        }
        self.routes.push(route);
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("chain", &self.chain)
            .field("routes", &self.routes)
            .field("indexed_methods", &self.index.len())
            .field("default", &self.default.is_some())
            .finish()
    }
}

impl Handler for Router {
    fn serve<'a>(
        &'a self,
        writer: &'a mut dyn ResponseWriter,
        request: RequestMessage,
    ) -> BoxFuture<'a, ()> {
        self.resolve(&request).serve(writer, request)
    }
}
