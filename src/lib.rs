//! Tandem - a synchronized carousel relation engine.
//!
//! Multiple carousel instances on one page form relation groups: a master
//! carousel drives its followers. Tandem owns the relation layer only; the
//! slide-viewport engine (transform math, touch physics) is a pluggable
//! collaborator behind [`engine::ViewportEngine`].
//!
//! What the relation layer does:
//! - discovers hosts declaratively (`data-gallery` / `data-gallery-follows`)
//!   and manages instance lifecycle, including polling while the engine
//!   collaborator is absent
//! - maps slide elements to stable logical indices so wrap-around duplicates
//!   share one identity
//! - mirrors the master's visible and primary slides onto follower markup,
//!   coalescing high-frequency triggers through throttles and debounces
//! - routes follower slide taps back into master navigation, suppressed
//!   while a master-driven scroll targets that follower
//! - tears groups down and rebuilds them when the viewport width crosses the
//!   axis threshold, preserving the master's position
//! - relocates whole groups into a fullscreen overlay and back, preserving
//!   engine state
//!
//! Everything runs on an explicit [`runtime::Runtime`] with virtual time and
//! an element arena ([`host::Dom`]), so the full behavior is testable
//! deterministically; see [`testkit`] for scripted collaborators.
//!
//! # Example
//!
//! ```
//! use tandem::host::Dom;
//! use tandem::relation::CarouselContext;
//! use tandem::runtime::Runtime;
//! use tandem::testkit::ScriptedFactory;
//! use tandem::types::{ATTR_GROUP, ATTR_TRACK};
//!
//! let dom = Dom::new();
//! let runtime = Runtime::new();
//! let ctx = CarouselContext::new(dom.clone(), runtime.clone());
//!
//! let host = dom.create("div");
//! dom.set_attr(host, ATTR_GROUP, "gallery");
//! let track = dom.create("div");
//! dom.set_attr(track, ATTR_TRACK, "");
//! dom.append(host, track);
//! dom.append(dom.root(), host);
//!
//! ctx.provide_engine_factory(ScriptedFactory::new(dom.clone()));
//! assert!(ctx.instance_for_host(host).is_some());
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod mapper;
pub mod relation;
pub mod runtime;
pub mod schedule;
pub mod testkit;
pub mod types;

pub use config::CarouselConfig;
pub use error::{ConfigError, RegisterError};
pub use relation::{CarouselContext, ContextSettings, FullscreenAction, InstanceId};
