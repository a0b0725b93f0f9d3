//! Click fan-out: one detail fetch and one trace fetch per direction,
//! reconciled with the engine as each of them settles.

use std::cell::RefCell;
use std::rc::Rc;

use foundation::TraceDirection;
use futures_util::future::{AbortHandle, AbortRegistration, Abortable, join3};
use runtime::{Frame, Generation};
use serde::Serialize;
use streaming::{DetailService, FetchError, LocalBoxFuture, TraceService};
use tracing::debug;

use crate::engine::{Explorer, FetchPlan, Resolution};
use crate::router::RawEvent;
use crate::subscription::{EventHub, Subscription};

#[derive(Clone)]
pub struct Services {
    pub detail: Rc<dyn DetailService>,
    pub trace: Rc<dyn TraceService>,
}

impl Services {
    /// Both lookups served by one collaborator, e.g. `HttpCollections`.
    pub fn shared<S>(service: Rc<S>) -> Self
    where
        S: DetailService + TraceService + 'static,
    {
        Self {
            detail: service.clone(),
            trace: service,
        }
    }
}

/// How each fetch of one click ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct ClickReport {
    pub generation: u64,
    pub detail: Resolution,
    pub upstream: Resolution,
    pub downstream: Resolution,
}

struct Inflight {
    generation: Generation,
    handles: [AbortHandle; 3],
}

/// Issues the fetches for each click.
///
/// By default a new click aborts the requests of the click it supersedes.
/// Results that still arrive late are discarded by generation either way.
pub struct ClickFetcher {
    services: Services,
    inflight: Option<Inflight>,
    cancel_superseded: bool,
}

impl ClickFetcher {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            inflight: None,
            cancel_superseded: true,
        }
    }

    /// Lets superseded requests run to completion.
    pub fn without_cancellation(services: Services) -> Self {
        Self {
            cancel_superseded: false,
            ..Self::new(services)
        }
    }

    pub fn inflight_generation(&self) -> Option<Generation> {
        self.inflight.as_ref().map(|i| i.generation)
    }

    /// Aborts the outstanding requests, if cancellation is enabled.
    pub fn cancel(&mut self) {
        if !self.cancel_superseded {
            return;
        }
        if let Some(inflight) = self.inflight.take() {
            debug!(generation = %inflight.generation, "aborting superseded fetches");
            for handle in &inflight.handles {
                handle.abort();
            }
        }
    }

    /// Returns a future that runs the three fetches for `plan` concurrently
    /// and hands each result to `engine` as soon as it settles.
    pub fn begin(
        &mut self,
        engine: Rc<RefCell<Explorer>>,
        plan: FetchPlan,
    ) -> LocalBoxFuture<'static, ClickReport> {
        self.cancel();

        let (detail_handle, detail_reg) = AbortHandle::new_pair();
        let (up_handle, up_reg) = AbortHandle::new_pair();
        let (down_handle, down_reg) = AbortHandle::new_pair();
        let FetchPlan {
            generation,
            uid,
            kind,
            subid,
        } = plan;
        self.inflight = Some(Inflight {
            generation,
            handles: [detail_handle, up_handle, down_handle],
        });
        debug!(%uid, %subid, %generation, "fetching detail and traces");

        let detail = {
            let engine = engine.clone();
            let service = self.services.detail.clone();
            let subid = subid.clone();
            async move {
                let result = Abortable::new(service.fetch_detail(kind, &subid), detail_reg)
                    .await
                    .unwrap_or(Err(FetchError::Cancelled));
                engine.borrow_mut().resolve_detail(generation, result)
            }
        };

        let trace = |direction: TraceDirection, reg: AbortRegistration| {
            let engine = engine.clone();
            let service = self.services.trace.clone();
            let subid = subid.clone();
            async move {
                let result = Abortable::new(service.fetch_trace(direction, &subid), reg)
                    .await
                    .unwrap_or(Err(FetchError::Cancelled));
                engine.borrow_mut().resolve_trace(generation, direction, result)
            }
        };
        let upstream = trace(TraceDirection::Upstream, up_reg);
        let downstream = trace(TraceDirection::Downstream, down_reg);

        Box::pin(async move {
            let (detail, upstream, downstream) = join3(detail, upstream, downstream).await;
            ClickReport {
                generation: generation.0,
                detail,
                upstream,
                downstream,
            }
        })
    }
}

/// An engine wired to an [`EventHub`].
///
/// Every published event is routed through the engine; clicks start their
/// fetches through `spawn`. The listener stays attached while the session
/// lives.
pub struct Session {
    engine: Rc<RefCell<Explorer>>,
    fetcher: Rc<RefCell<ClickFetcher>>,
    _subscription: Subscription,
}

impl Session {
    pub fn attach(
        hub: &Rc<EventHub>,
        engine: Explorer,
        fetcher: ClickFetcher,
        spawn: impl Fn(LocalBoxFuture<'static, ClickReport>) + 'static,
    ) -> Self {
        let engine = Rc::new(RefCell::new(engine));
        let fetcher = Rc::new(RefCell::new(fetcher));
        let subscription = {
            let engine = engine.clone();
            let fetcher = fetcher.clone();
            hub.subscribe(move |event: &RawEvent| {
                let plan = engine.borrow_mut().handle(event);
                match plan {
                    Some(plan) => {
                        let task = fetcher.borrow_mut().begin(engine.clone(), plan);
                        spawn(task);
                    }
                    None => {
                        if engine.borrow().selected_subid().is_none() {
                            fetcher.borrow_mut().cancel();
                        }
                    }
                }
            })
        };
        Self {
            engine,
            fetcher,
            _subscription: subscription,
        }
    }

    pub fn engine(&self) -> Rc<RefCell<Explorer>> {
        self.engine.clone()
    }

    pub fn inflight_generation(&self) -> Option<Generation> {
        self.fetcher.borrow().inflight_generation()
    }

    pub fn tick(&self, frame: Frame) {
        self.engine.borrow_mut().tick(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::{ClickFetcher, ClickReport, Services, Session};
    use crate::engine::{Explorer, FetchPlan, Resolution, Surfaces};
    use crate::headless::{HeadlessPopup, HeadlessViewport, MemoryDownloads, SharedLayer};
    use crate::router::{RawEvent, RawLatLng};
    use crate::subscription::EventHub;
    use foundation::{FeatureKind, FeatureUid, SubId, TraceDirection};
    use layers::{Classification, RecordingLayer, StyleTable};
    use pretty_assertions::assert_eq;
    use runtime::{Counter, Frame};
    use serde_json::{Value, json};
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;
    use streaming::{
        DetailPayload, DetailService, FetchError, LocalBoxFuture, TraceService,
    };
    use tokio::sync::oneshot;
    use tokio::task::{JoinHandle, LocalSet, spawn_local};

    type DetailReply = Result<DetailPayload, FetchError>;
    type TraceReply = Result<Vec<FeatureUid>, FetchError>;

    /// Answers each request when the test sends on its gate.
    #[derive(Default)]
    struct Gated {
        details: RefCell<BTreeMap<String, oneshot::Receiver<DetailReply>>>,
        traces: RefCell<BTreeMap<(String, String), oneshot::Receiver<TraceReply>>>,
    }

    // Trace gates are keyed by (direction, subid).
    struct Gates {
        detail: oneshot::Sender<DetailReply>,
        upstream: oneshot::Sender<TraceReply>,
        downstream: oneshot::Sender<TraceReply>,
    }

    impl Gated {
        fn gate(&self, subid: &str) -> Gates {
            let (detail, rx) = oneshot::channel();
            self.details.borrow_mut().insert(subid.to_string(), rx);
            let (upstream, rx) = oneshot::channel();
            self.traces
                .borrow_mut()
                .insert((TraceDirection::Upstream.to_string(), subid.to_string()), rx);
            let (downstream, rx) = oneshot::channel();
            self.traces
                .borrow_mut()
                .insert((TraceDirection::Downstream.to_string(), subid.to_string()), rx);
            Gates {
                detail,
                upstream,
                downstream,
            }
        }
    }

    impl DetailService for Gated {
        fn fetch_detail(
            &self,
            _kind: FeatureKind,
            subid: &SubId,
        ) -> LocalBoxFuture<'_, DetailReply> {
            let rx = self.details.borrow_mut().remove(subid.as_str());
            Box::pin(async move {
                match rx {
                    Some(rx) => rx
                        .await
                        .unwrap_or(Err(FetchError::Transport("gate dropped".to_string()))),
                    None => Err(FetchError::Status(404)),
                }
            })
        }
    }

    impl TraceService for Gated {
        fn fetch_trace(
            &self,
            direction: TraceDirection,
            subid: &SubId,
        ) -> LocalBoxFuture<'_, TraceReply> {
            let key = (direction.to_string(), subid.to_string());
            let rx = self.traces.borrow_mut().remove(&key);
            Box::pin(async move {
                match rx {
                    Some(rx) => rx
                        .await
                        .unwrap_or(Err(FetchError::Transport("gate dropped".to_string()))),
                    None => Err(FetchError::Status(404)),
                }
            })
        }
    }

    fn engine(layer: &SharedLayer) -> Explorer {
        Explorer::new(
            StyleTable::default(),
            Surfaces {
                layer: Box::new(layer.clone()),
                viewport: Box::new(HeadlessViewport::default()),
                popup: Box::new(HeadlessPopup::default()),
                downloads: Box::new(MemoryDownloads::default()),
            },
        )
    }

    fn layer() -> SharedLayer {
        SharedLayer::new(
            RecordingLayer::new()
                .with_feature("R1", FeatureKind::River)
                .with_feature("R2", FeatureKind::River)
                .with_feature("R3", FeatureKind::River)
                .with_feature("L9", FeatureKind::Lake),
        )
    }

    fn click(uid: &str, subid: u64) -> RawEvent {
        let value = json!({ "uid": uid, "subid": subid, "islake": uid.starts_with('L') });
        let properties = match value {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        RawEvent::Click {
            properties,
            latlng: Some(RawLatLng {
                lat: 49.0,
                lng: -123.0,
            }),
        }
    }

    fn plan(engine: &Rc<RefCell<Explorer>>, uid: &str, subid: u64) -> FetchPlan {
        engine.borrow_mut().handle(&click(uid, subid)).unwrap()
    }

    fn uids(ids: &[&str]) -> Vec<FeatureUid> {
        ids.iter().map(|s| FeatureUid::new(*s)).collect()
    }

    fn payload(subid: &str) -> DetailPayload {
        DetailPayload::new(SubId::new(subid), json!({ "type": "Feature" }))
    }

    async fn superseded_click(
        cancel: bool,
    ) -> (ClickReport, ClickReport, Rc<RefCell<Explorer>>, SharedLayer) {
        let gated = Rc::new(Gated::default());
        let services = Services::shared(gated.clone());
        let mut fetcher = if cancel {
            ClickFetcher::new(services)
        } else {
            ClickFetcher::without_cancellation(services)
        };
        let layer = layer();
        let engine = Rc::new(RefCell::new(engine(&layer)));

        let gates_a = gated.gate("1");
        let gates_b = gated.gate("9");
        let first = plan(&engine, "R1", 1);
        let a = spawn_local(fetcher.begin(engine.clone(), first));
        // Let the first click's requests go out before it is superseded.
        tokio::task::yield_now().await;
        let second = plan(&engine, "L9", 9);
        let b = spawn_local(fetcher.begin(engine.clone(), second));

        let _ = gates_b.detail.send(Ok(payload("9")));
        let _ = gates_b.upstream.send(Ok(uids(&["R3"])));
        let _ = gates_b.downstream.send(Ok(vec![]));
        let report_b = b.await.unwrap();

        let _ = gates_a.detail.send(Ok(payload("1")));
        let _ = gates_a.upstream.send(Ok(uids(&["R2"])));
        let _ = gates_a.downstream.send(Ok(uids(&["R3"])));
        let report_a = a.await.unwrap();
        (report_a, report_b, engine, layer)
    }

    fn expect_newer_click_wins(engine: &Rc<RefCell<Explorer>>, layer: &SharedLayer) {
        let engine = engine.borrow();
        let store = engine.store();
        assert_eq!(engine.selected_subid(), Some(&SubId::new("9")));
        assert_eq!(store.classification(&FeatureUid::new("R2")), Classification::Idle);
        assert_eq!(
            store.classification(&FeatureUid::new("R3")),
            Classification::UpstreamMember
        );
        assert_eq!(layer.style_of("R1"), None);
        assert_eq!(layer.style_of("R2"), None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn superseded_fetches_are_aborted() {
        LocalSet::new()
            .run_until(async {
                let (a, b, engine, layer) = superseded_click(true).await;
                assert_eq!(
                    (a.detail, a.upstream, a.downstream),
                    (Resolution::Cancelled, Resolution::Cancelled, Resolution::Cancelled)
                );
                assert_eq!(b.upstream, Resolution::Applied);
                expect_newer_click_wins(&engine, &layer);
                let counters = engine.borrow().counters();
                assert_eq!(counters.get(Counter::FetchesCancelled), 3);
                assert_eq!(counters.get(Counter::StaleDiscarded), 0);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn late_responses_without_cancellation_are_stale() {
        LocalSet::new()
            .run_until(async {
                let (a, b, engine, layer) = superseded_click(false).await;
                assert_eq!(
                    (a.detail, a.upstream, a.downstream),
                    (Resolution::Stale, Resolution::Stale, Resolution::Stale)
                );
                assert_eq!(b.detail, Resolution::Applied);
                expect_newer_click_wins(&engine, &layer);
                let counters = engine.borrow().counters();
                assert_eq!(counters.get(Counter::StaleDiscarded), 3);
                assert_eq!(counters.get(Counter::FetchesCancelled), 0);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn one_failed_direction_does_not_block_the_others() {
        LocalSet::new()
            .run_until(async {
                let gated = Rc::new(Gated::default());
                let mut fetcher = ClickFetcher::new(Services::shared(gated.clone()));
                let layer = layer();
                let engine = Rc::new(RefCell::new(engine(&layer)));
                let gates = gated.gate("42");
                let p = plan(&engine, "R1", 42);
                let task = spawn_local(fetcher.begin(engine.clone(), p));

                let _ = gates.upstream.send(Err(FetchError::Status(502)));
                let _ = gates.downstream.send(Ok(uids(&["R1", "R2"])));
                let _ = gates.detail.send(Ok(payload("42")));
                let report = task.await.unwrap();

                assert_eq!(report.upstream, Resolution::Failed);
                assert_eq!(report.downstream, Resolution::Applied);
                assert_eq!(report.detail, Resolution::Applied);
                let engine = engine.borrow();
                let down = engine.store().trace(TraceDirection::Downstream);
                assert_eq!(down.iter().cloned().collect::<Vec<_>>(), uids(&["R2"]));
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn session_routes_published_events_and_spawns_fetches() {
        LocalSet::new()
            .run_until(async {
                let gated = Rc::new(Gated::default());
                let layer = layer();
                let hub = EventHub::new();
                let tasks: Rc<RefCell<Vec<JoinHandle<ClickReport>>>> = Rc::default();
                let spawned = tasks.clone();
                let session = Session::attach(
                    &hub,
                    engine(&layer),
                    ClickFetcher::new(Services::shared(gated.clone())),
                    move |task| spawned.borrow_mut().push(spawn_local(task)),
                );

                let gates = gated.gate("42");
                hub.publish(click("R1", 42));
                session.tick(Frame::new(1, 16.0));
                assert_eq!(tasks.borrow().len(), 1);
                assert!(session.inflight_generation().is_some());

                let _ = gates.detail.send(Ok(payload("42")));
                let _ = gates.upstream.send(Ok(uids(&["R2", "R3"])));
                let _ = gates.downstream.send(Ok(vec![]));
                let task = tasks.borrow_mut().remove(0);
                let report = task.await.unwrap();
                assert_eq!(report.upstream, Resolution::Applied);
                assert_eq!(
                    layer.style_of("R2"),
                    StyleTable::default()
                        .resolve(FeatureKind::River, Classification::UpstreamMember)
                        .cloned()
                );

                hub.publish(RawEvent::Popupclose);
                assert_eq!(session.inflight_generation(), None);
                assert_eq!(layer.with(|l| l.override_count()), 0);

                drop(session);
                assert_eq!(hub.listener_count(), 0);
            })
            .await;
    }
}
