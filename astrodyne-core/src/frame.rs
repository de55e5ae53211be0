//! Reference-frame graph: named frames linked by parent relationships, with
//! runtime transform composition between any two frames at any instant.
//!
//! The teacher crate exposes a fixed pair of frames (GCRF, ITRF) joined by a
//! single free function (`frames.rs`'s `position_ecef_to_eci` and friends).
//! This module generalizes that into an open, named graph: any number of
//! frames, each parented to one other frame (or to nothing, for an inertial
//! root), each carrying a [`Provider`] that knows how to compute its
//! transform to its parent at a given instant. Composing a transform
//! between two arbitrary frames is reduced to finding their lowest common
//! ancestor and composing two short chains of provider transforms, mirroring
//! how the teacher composes GCRF <-> ITRF from three matrix multiplications
//! in `iau_frames::rotation_eci_to_ecef`.
//!
//! Frames are identified by an opaque [`FrameHandle`] rather than a shared
//! pointer, since Rust's ownership rules make a graph of `Rc`/`Arc` nodes
//! referencing each other awkward; the process-wide [`FrameManager`] owns
//! every node and hands out handles, the same shape as the teacher's
//! process-wide EOP singleton in `eop.rs`.

use crate::error::{AstrodyneError, Result};
use crate::instant::Instant;
use crate::transform::Transform;
use nalgebra::Vector3;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A polymorphic source of one frame-graph edge's transform: the transform
/// from a frame's parent to the frame itself, evaluated at an instant.
pub trait Provider: Send + Sync {
    fn transform_at(&self, instant: Instant) -> Result<Transform>;
}

/// Opaque, stable identifier for a registered frame. Cheap to copy and
/// compare; carries no borrow on the [`FrameManager`] that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

struct FrameNode {
    name: String,
    is_quasi_inertial: bool,
    parent: Option<FrameHandle>,
    provider: Arc<dyn Provider>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    frames: HashMap<FrameHandle, FrameNode>,
    names: HashMap<String, FrameHandle>,
}

/// Cache key: the ordered pair of frames and the TAI nanosecond count of
/// the query instant.
type CacheKey = (FrameHandle, FrameHandle, i64);

/// Process-wide frame registry and transform cache.
///
/// Registration takes a write lock on the registry; `transform_to` takes a
/// read lock to walk the graph and a short write lock only to insert a
/// freshly computed result into the cache, so concurrent lookups against an
/// already-registered graph never block each other.
pub struct FrameManager {
    registry: RwLock<Registry>,
    cache: RwLock<HashMap<CacheKey, Transform>>,
}

static GLOBAL_MANAGER: Lazy<FrameManager> = Lazy::new(FrameManager::new);

impl FrameManager {
    fn new() -> FrameManager {
        FrameManager {
            registry: RwLock::new(Registry::default()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide frame manager. Frames register themselves here
    /// lazily, on first access to a well-known frame constructor in
    /// [`crate::well_known`], rather than at process startup.
    pub fn global() -> &'static FrameManager {
        &GLOBAL_MANAGER
    }

    /// Register a new frame. `parent` must be `None` only for an inertial
    /// root (GCRF); every other frame in the graph has to resolve up to one.
    pub fn register(
        &self,
        name: &str,
        is_quasi_inertial: bool,
        parent: Option<FrameHandle>,
        provider: Arc<dyn Provider>,
    ) -> Result<FrameHandle> {
        let mut registry = self.registry.write().unwrap();
        if registry.names.contains_key(name) {
            return Err(AstrodyneError::RegistryConflict(format!(
                "frame '{}' is already registered",
                name
            )));
        }
        if let Some(parent_handle) = parent {
            if !registry.frames.contains_key(&parent_handle) {
                return Err(AstrodyneError::DomainError(format!(
                    "parent handle for frame '{}' is not registered",
                    name
                )));
            }
        }

        let handle = FrameHandle(registry.next_id);
        registry.next_id += 1;
        registry.frames.insert(
            handle,
            FrameNode {
                name: name.to_string(),
                is_quasi_inertial,
                parent,
                provider,
            },
        );
        registry.names.insert(name.to_string(), handle);
        Ok(handle)
    }

    /// Remove a frame by name, evicting every cached transform that
    /// mentions it. Errors if other registered frames still parent off it.
    pub fn destruct(&self, name: &str) -> Result<()> {
        let handle = {
            let mut registry = self.registry.write().unwrap();
            let handle = *registry
                .names
                .get(name)
                .ok_or_else(|| AstrodyneError::DomainError(format!("no frame named '{}'", name)))?;

            let has_dependent = registry
                .frames
                .values()
                .any(|node| node.parent == Some(handle));
            if has_dependent {
                return Err(AstrodyneError::DomainError(format!(
                    "cannot destruct frame '{}': other frames are parented to it",
                    name
                )));
            }

            registry.names.remove(name);
            registry.frames.remove(&handle);
            handle
        };

        self.cache
            .write()
            .unwrap()
            .retain(|(from, to, _), _| *from != handle && *to != handle);
        Ok(())
    }

    /// Look up a registered frame by name.
    pub fn with_name(&self, name: &str) -> Option<FrameHandle> {
        self.registry.read().unwrap().names.get(name).copied()
    }

    /// Drop every cached transform, without touching the registered graph.
    pub fn clear_cache(&self) {
        self.cache.write().unwrap().clear();
    }

    /// Remove every registered frame and clear the cache. Meant for test
    /// isolation between cases that each want to build their own small
    /// graph; a long-running process has no reason to call this.
    pub fn reset(&self) {
        *self.registry.write().unwrap() = Registry::default();
        self.cache.write().unwrap().clear();
    }

    fn require_node<T>(&self, handle: FrameHandle, f: impl FnOnce(&FrameNode) -> T) -> Result<T> {
        self.registry
            .read()
            .unwrap()
            .frames
            .get(&handle)
            .map(f)
            .ok_or_else(|| AstrodyneError::DomainError("frame handle is not registered".to_string()))
    }

    fn name_of(&self, handle: FrameHandle) -> Result<String> {
        self.require_node(handle, |n| n.name.clone())
    }

    fn parent_of(&self, handle: FrameHandle) -> Result<Option<FrameHandle>> {
        self.require_node(handle, |n| n.parent)
    }

    fn provider_of(&self, handle: FrameHandle) -> Result<Arc<dyn Provider>> {
        self.require_node(handle, |n| n.provider.clone())
    }

    fn is_quasi_inertial(&self, handle: FrameHandle) -> Result<bool> {
        self.require_node(handle, |n| n.is_quasi_inertial)
    }

    fn depth(&self, mut handle: FrameHandle) -> Result<u32> {
        let mut depth = 0;
        while let Some(parent) = self.parent_of(handle)? {
            handle = parent;
            depth += 1;
        }
        Ok(depth)
    }

    /// Lowest common ancestor of `a` and `b`: depth-balance the deeper
    /// chain, then walk both up in lockstep until they meet.
    fn common_ancestor(&self, mut a: FrameHandle, mut b: FrameHandle) -> Result<FrameHandle> {
        let depth_err = || {
            AstrodyneError::DomainError(
                "frames do not share a common inertial root".to_string(),
            )
        };

        let mut depth_a = self.depth(a)?;
        let mut depth_b = self.depth(b)?;

        while depth_a > depth_b {
            a = self.parent_of(a)?.ok_or_else(depth_err)?;
            depth_a -= 1;
        }
        while depth_b > depth_a {
            b = self.parent_of(b)?.ok_or_else(depth_err)?;
            depth_b -= 1;
        }

        while a != b {
            a = self.parent_of(a)?.ok_or_else(depth_err)?;
            b = self.parent_of(b)?.ok_or_else(depth_err)?;
        }
        Ok(a)
    }

    /// Transform mapping `frame`'s coordinates into `ancestor`'s coordinates
    /// (`ancestor` must be `frame` itself or a proper ancestor of it),
    /// composing the inverse of each provider's parent-to-frame transform
    /// along the way.
    fn transform_to_ancestor(
        &self,
        frame: FrameHandle,
        ancestor: FrameHandle,
        instant: Instant,
    ) -> Result<Transform> {
        let mut accum = Transform::identity(instant);
        let mut current = frame;
        while current != ancestor {
            let step = self.provider_of(current)?.transform_at(instant)?.inverse();
            accum = step.compose(&accum)?;
            current = self.parent_of(current)?.ok_or_else(|| {
                AstrodyneError::DomainError(format!(
                    "frame '{}' has no path to the requested ancestor",
                    self.name_of(frame).unwrap_or_default()
                ))
            })?;
        }
        Ok(accum)
    }

    /// The transform mapping `from`'s coordinates into `to`'s coordinates
    /// at `instant`: identity if the frames coincide, a cache hit if this
    /// pair and instant were resolved before, otherwise composed via the
    /// lowest common ancestor and cached in both directions.
    pub fn transform_to(&self, from: FrameHandle, to: FrameHandle, instant: Instant) -> Result<Transform> {
        if from == to {
            return Ok(Transform::identity(instant));
        }

        let instant_key = instant.tai_nanoseconds()?;
        let key = (from, to, instant_key);
        if let Some(hit) = self.cache.read().unwrap().get(&key) {
            return Ok(*hit);
        }

        let ancestor = self.common_ancestor(from, to)?;
        let from_to_ancestor = self.transform_to_ancestor(from, ancestor, instant)?;
        let to_to_ancestor = self.transform_to_ancestor(to, ancestor, instant)?;
        let result = to_to_ancestor.inverse().compose(&from_to_ancestor)?;

        let mut cache = self.cache.write().unwrap();
        cache.insert((from, to, instant_key), result);
        cache.insert((to, from, instant_key), result.inverse());
        Ok(result)
    }
}

/// A handle-bearing view of one registered frame: the published query
/// surface over [`FrameManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame(pub(crate) FrameHandle);

impl Frame {
    /// Register a new frame under the global [`FrameManager`].
    pub fn register(
        name: &str,
        is_quasi_inertial: bool,
        parent: Option<Frame>,
        provider: Arc<dyn Provider>,
    ) -> Result<Frame> {
        let handle = FrameManager::global().register(name, is_quasi_inertial, parent.map(|f| f.0), provider)?;
        Ok(Frame(handle))
    }

    /// Look up a registered frame by name.
    pub fn with_name(name: &str) -> Option<Frame> {
        FrameManager::global().with_name(name).map(Frame)
    }

    /// Remove a registered frame by name.
    pub fn destruct(name: &str) -> Result<()> {
        FrameManager::global().destruct(name)
    }

    pub fn name(&self) -> Result<String> {
        FrameManager::global().name_of(self.0)
    }

    pub fn is_quasi_inertial(&self) -> Result<bool> {
        FrameManager::global().is_quasi_inertial(self.0)
    }

    pub fn has_parent(&self) -> Result<bool> {
        Ok(FrameManager::global().parent_of(self.0)?.is_some())
    }

    pub fn parent(&self) -> Result<Option<Frame>> {
        Ok(FrameManager::global().parent_of(self.0)?.map(Frame))
    }

    /// The frame `degree` parent-links up from this one; `ancestor(0)` is
    /// this frame itself.
    pub fn ancestor(&self, degree: u32) -> Result<Frame> {
        let mut current = *self;
        for _ in 0..degree {
            current = current.parent()?.ok_or_else(|| {
                AstrodyneError::DomainError("requested ancestor degree exceeds frame depth".to_string())
            })?;
        }
        Ok(current)
    }

    /// Number of parent links from this frame up to its inertial root.
    pub fn depth(&self) -> Result<u32> {
        FrameManager::global().depth(self.0)
    }

    /// The transform mapping this frame's coordinates into `other`'s
    /// coordinates at `instant`.
    pub fn transform_to(&self, other: Frame, instant: Instant) -> Result<Transform> {
        FrameManager::global().transform_to(self.0, other.0, instant)
    }

    /// Position of this frame's origin, expressed in `other`.
    pub fn origin_in(&self, other: Frame, instant: Instant) -> Result<Vector3<f64>> {
        Ok(self.transform_to(other, instant)?.apply_point(Vector3::zeros()))
    }

    /// Velocity of this frame's origin, expressed in `other`.
    pub fn velocity_in(&self, other: Frame, instant: Instant) -> Result<Vector3<f64>> {
        let t = self.transform_to(other, instant)?;
        Ok(t.apply_velocity(Vector3::zeros(), Vector3::zeros()))
    }

    /// This frame's basis vectors (x, y, z), expressed in `other`.
    pub fn axes_in(&self, other: Frame, instant: Instant) -> Result<[Vector3<f64>; 3]> {
        let t = self.transform_to(other, instant)?;
        Ok([
            t.apply_free_vector(Vector3::x_axis().into_inner()),
            t.apply_free_vector(Vector3::y_axis().into_inner()),
            t.apply_free_vector(Vector3::z_axis().into_inner()),
        ])
    }
}
