//! 请求状态分发
//!
//! 把轮询到的状态快照转换成界面更新。
//! 相同状态只产生一次更新；终态停止关联的轮询器并清除当前请求。
//! 分发器本身不渲染，调用方释放状态借用后再交给视图。

use crate::poller::Poller;
use crate::view::{Notice, View, ViewUpdate};
use campuspool_shared::{RideStatus, StatusSnapshot};
use std::rc::Rc;

/// 一次状态变化对应的界面输出
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub status: RideStatus,
    pub update: ViewUpdate,
    pub notice: Notice,
}

impl Transition {
    pub fn show(&self, view: &dyn View) {
        view.render(self.update.clone());
        view.notify(self.notice.clone());
    }
}

/// 一次分发的结果
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// 没有活动请求，或快照属于另一个请求
    Stale,
    /// 与上次看到的状态相同
    Unchanged,
    Changed(Transition),
}

#[derive(Debug, Default)]
pub struct StatusDispatcher {
    active: Option<String>,
    last_seen: Option<RideStatus>,
    linked: Vec<Rc<Poller>>,
}

impl StatusDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始跟踪新请求
    ///
    /// `seen` 是调用方已经渲染过的状态，之后收到相同状态不会重复产生更新。
    pub fn begin(&mut self, request_id: &str, seen: Option<RideStatus>) {
        self.active = Some(request_id.to_string());
        self.last_seen = seen;
    }

    /// 关联一个随请求终止而停止的轮询器，重复关联只记一次
    pub fn link(&mut self, poller: &Rc<Poller>) {
        if !self.linked.iter().any(|p| Rc::ptr_eq(p, poller)) {
            self.linked.push(poller.clone());
        }
    }

    pub fn active_request(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn last_seen(&self) -> Option<RideStatus> {
        self.last_seen
    }

    pub fn dispatch(&mut self, request_id: &str, snapshot: &StatusSnapshot) -> DispatchOutcome {
        if self.active.as_deref() != Some(request_id) {
            return DispatchOutcome::Stale;
        }
        let status = snapshot.status;
        if self.last_seen == Some(status) {
            return DispatchOutcome::Unchanged;
        }

        tracing::debug!(request_id, from = ?self.last_seen, to = %status, "ride status changed");
        self.last_seen = Some(status);
        let transition = Transition {
            status,
            update: render_status(request_id, snapshot),
            notice: status_notice(status),
        };

        if status.is_terminal() {
            self.halt();
        }
        DispatchOutcome::Changed(transition)
    }

    /// 停止关联的轮询器并清除当前请求
    pub fn halt(&mut self) {
        for poller in self.linked.drain(..) {
            poller.stop();
        }
        self.active = None;
        self.last_seen = None;
    }
}

fn render_status(request_id: &str, snapshot: &StatusSnapshot) -> ViewUpdate {
    let request_id = request_id.to_string();
    match snapshot.status {
        RideStatus::Pending => ViewUpdate::AwaitingDriver {
            request_id,
            estimated_fare: snapshot.estimated_fare,
        },
        RideStatus::Accepted => ViewUpdate::DriverAssigned {
            request_id,
            driver: snapshot.driver.clone(),
            otp: snapshot.otp.clone(),
        },
        RideStatus::Started => ViewUpdate::TripStarted { request_id },
        RideStatus::Completed => ViewUpdate::TripCompleted {
            request_id,
            fare: snapshot.estimated_fare,
        },
        RideStatus::Rejected => ViewUpdate::RequestDeclined { request_id },
        RideStatus::Cancelled => ViewUpdate::RequestCancelled { request_id },
    }
}

fn status_notice(status: RideStatus) -> Notice {
    match status {
        RideStatus::Pending => Notice::info("Waiting for driver confirmation..."),
        RideStatus::Accepted => {
            Notice::success("Great! Your ride has been accepted. Driver details are shown above.")
        }
        RideStatus::Started => Notice::success("Your ride has started! Have a safe journey."),
        RideStatus::Completed => {
            Notice::success("Ride completed successfully! Thank you for using CampusPool.")
        }
        RideStatus::Rejected => Notice::warning(
            "Your ride request was declined. Please try requesting another ride.",
        ),
        RideStatus::Cancelled => Notice::info("Your ride request was cancelled."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{NoticeLevel, RecordingView};
    use campuspool_shared::Contact;
    use std::time::Duration;
    use tokio::task::LocalSet;

    fn snapshot(status: RideStatus) -> StatusSnapshot {
        let mut snap = StatusSnapshot::new(status);
        if status == RideStatus::Accepted {
            snap.driver = Some(ravi());
            snap.otp = Some("4821".into());
        }
        snap
    }

    fn ravi() -> Contact {
        Contact {
            name: "Ravi".into(),
            rating: 4.8,
            phone: "9000000000".into(),
        }
    }

    /// 分发并把状态变化交给视图
    fn feed(
        d: &mut StatusDispatcher,
        view: &RecordingView,
        id: &str,
        status: RideStatus,
    ) -> DispatchOutcome {
        let outcome = d.dispatch(id, &snapshot(status));
        if let DispatchOutcome::Changed(transition) = &outcome {
            transition.show(view);
        }
        outcome
    }

    fn changed_to(outcome: &DispatchOutcome) -> Option<RideStatus> {
        match outcome {
            DispatchOutcome::Changed(t) => Some(t.status),
            _ => None,
        }
    }

    fn idle_poller() -> Rc<Poller> {
        let poller = Rc::new(Poller::new("status", Duration::from_secs(5)));
        poller.start(|| std::future::ready(()));
        poller
    }

    #[test]
    fn test_dispatch_without_active_request_is_stale() {
        let mut d = StatusDispatcher::new();
        assert_eq!(
            d.dispatch("r1", &snapshot(RideStatus::Accepted)),
            DispatchOutcome::Stale
        );
    }

    #[test]
    fn test_snapshot_for_other_request_is_stale() {
        let mut d = StatusDispatcher::new();
        d.begin("r1", None);
        assert_eq!(
            d.dispatch("r0", &snapshot(RideStatus::Cancelled)),
            DispatchOutcome::Stale
        );
        assert_eq!(d.active_request(), Some("r1"));
    }

    #[test]
    fn test_pending_three_times_then_accepted() {
        let mut d = StatusDispatcher::new();
        d.begin("r1", Some(RideStatus::Pending));

        for _ in 0..3 {
            assert_eq!(
                d.dispatch("r1", &snapshot(RideStatus::Pending)),
                DispatchOutcome::Unchanged
            );
        }

        let DispatchOutcome::Changed(transition) = d.dispatch("r1", &snapshot(RideStatus::Accepted))
        else {
            panic!("accepted should change the status");
        };
        assert_eq!(transition.status, RideStatus::Accepted);
        assert_eq!(
            transition.update,
            ViewUpdate::DriverAssigned {
                request_id: "r1".into(),
                driver: Some(ravi()),
                otp: Some("4821".into()),
            }
        );
        assert_eq!(transition.notice.level, NoticeLevel::Success);
        assert_eq!(d.last_seen(), Some(RideStatus::Accepted));
    }

    #[test]
    fn test_show_renders_update_then_notice() {
        let view = RecordingView::new();
        let mut d = StatusDispatcher::new();
        d.begin("r1", None);

        feed(&mut d, &view, "r1", RideStatus::Pending);
        assert_eq!(
            view.updates(),
            vec![ViewUpdate::AwaitingDriver {
                request_id: "r1".into(),
                estimated_fare: None
            }]
        );
        assert_eq!(
            view.last_notice(),
            Some(Notice::info("Waiting for driver confirmation..."))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_lifecycle_renders_each_state_once() {
        LocalSet::new()
            .run_until(async {
                let view = RecordingView::new();
                let mut d = StatusDispatcher::new();
                let poller = idle_poller();
                d.begin("r1", None);
                d.link(&poller);

                let sequence = [
                    RideStatus::Pending,
                    RideStatus::Pending,
                    RideStatus::Accepted,
                    RideStatus::Accepted,
                    RideStatus::Started,
                    RideStatus::Started,
                ];
                for status in sequence {
                    feed(&mut d, &view, "r1", status);
                    assert!(poller.is_running());
                }

                let outcome = feed(&mut d, &view, "r1", RideStatus::Completed);
                assert_eq!(changed_to(&outcome), Some(RideStatus::Completed));
                assert!(!poller.is_running());
                assert_eq!(d.active_request(), None);

                // 终态之后的重复投递不会再渲染
                assert_eq!(
                    feed(&mut d, &view, "r1", RideStatus::Completed),
                    DispatchOutcome::Stale
                );

                let updates = view.updates();
                assert_eq!(updates.len(), 4);
                assert!(matches!(updates[0], ViewUpdate::AwaitingDriver { .. }));
                assert!(matches!(updates[1], ViewUpdate::DriverAssigned { .. }));
                assert!(matches!(updates[2], ViewUpdate::TripStarted { .. }));
                assert!(matches!(updates[3], ViewUpdate::TripCompleted { .. }));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_or_cancelled_stops_all_linked_pollers() {
        for terminal in [RideStatus::Rejected, RideStatus::Cancelled] {
            LocalSet::new()
                .run_until(async {
                    let mut d = StatusDispatcher::new();
                    let status_poller = idle_poller();
                    let tracking_poller = idle_poller();
                    d.begin("r1", Some(RideStatus::Pending));
                    d.link(&status_poller);
                    d.link(&tracking_poller);
                    d.link(&tracking_poller);

                    let outcome = d.dispatch("r1", &snapshot(terminal));

                    assert_eq!(changed_to(&outcome), Some(terminal));
                    assert!(!status_poller.is_running());
                    assert!(!tracking_poller.is_running());
                    assert_eq!(d.active_request(), None);
                })
                .await;
        }
    }

    #[test]
    fn test_rejected_notice_persists() {
        let view = RecordingView::new();
        let mut d = StatusDispatcher::new();
        d.begin("r1", Some(RideStatus::Pending));
        feed(&mut d, &view, "r1", RideStatus::Rejected);
        assert_eq!(view.last_notice().unwrap().level, NoticeLevel::Warning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_halt_stops_linked_pollers() {
        LocalSet::new()
            .run_until(async {
                let mut d = StatusDispatcher::new();
                let poller = idle_poller();
                d.begin("r1", Some(RideStatus::Pending));
                d.link(&poller);

                d.halt();
                d.halt();
                assert!(!poller.is_running());
                assert_eq!(d.active_request(), None);
            })
            .await;
    }
}
