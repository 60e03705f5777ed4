//! Filtering and counting of holiday and permission requests.

use super::time::from_nanos;
use super::window::TimeWindow;
use crate::backend::types::{HolidayRequest, PermissionRequest, Principal, RequestStatus, Time};

/// Fields shared by holiday and permission requests
pub trait Request {
  fn id(&self) -> u64;
  fn user(&self) -> &Principal;
  fn start_date(&self) -> Time;
  fn end_date(&self) -> Time;
  fn reason(&self) -> &str;
  fn status(&self) -> &RequestStatus;
}

macro_rules! impl_request {
  ($t:ty) => {
    impl Request for $t {
      fn id(&self) -> u64 {
        self.id
      }
      fn user(&self) -> &Principal {
        &self.user
      }
      fn start_date(&self) -> Time {
        self.start_date
      }
      fn end_date(&self) -> Time {
        self.end_date
      }
      fn reason(&self) -> &str {
        &self.reason
      }
      fn status(&self) -> &RequestStatus {
        &self.status
      }
    }
  };
}

impl_request!(HolidayRequest);
impl_request!(PermissionRequest);

/// Approval list filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestFilter {
  #[default]
  Pending,
  /// Anything no longer pending
  Processed,
  All,
}

impl RequestFilter {
  pub const ALL: &'static [RequestFilter] =
    &[RequestFilter::Pending, RequestFilter::Processed, RequestFilter::All];

  pub fn matches(&self, status: &RequestStatus) -> bool {
    match self {
      RequestFilter::Pending => *status == RequestStatus::Pending,
      RequestFilter::Processed => *status != RequestStatus::Pending,
      RequestFilter::All => true,
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      RequestFilter::Pending => "Pending",
      RequestFilter::Processed => "Processed",
      RequestFilter::All => "All",
    }
  }

  /// Next filter in tab order
  pub fn cycle(&self) -> Self {
    match self {
      RequestFilter::Pending => RequestFilter::Processed,
      RequestFilter::Processed => RequestFilter::All,
      RequestFilter::All => RequestFilter::Pending,
    }
  }
}

pub fn filter_requests<'a, R: Request>(requests: &'a [R], filter: RequestFilter) -> Vec<&'a R> {
  requests
    .iter()
    .filter(|r| filter.matches(r.status()))
    .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
  pub pending: usize,
  pub approved: usize,
  pub rejected: usize,
}

pub fn count_statuses<R: Request>(requests: &[R]) -> StatusCounts {
  let mut counts = StatusCounts::default();
  for request in requests {
    match request.status() {
      RequestStatus::Pending => counts.pending += 1,
      RequestStatus::Approved => counts.approved += 1,
      RequestStatus::Rejected => counts.rejected += 1,
      RequestStatus::Unknown(_) => {}
    }
  }
  counts
}

/// Whether a request touches the month window: it starts in the month, ends
/// in the month, or spans the whole month
pub fn overlaps_month<R: Request>(request: &R, month: &TimeWindow) -> bool {
  let start = from_nanos(request.start_date());
  let end = from_nanos(request.end_date());
  month.contains(start) || month.contains(end) || (start < month.start() && end > month.end())
}

/// Requests overlapping the window, newest start first
pub fn in_month<'a, R: Request>(requests: &'a [R], month: &TimeWindow) -> Vec<&'a R> {
  let mut rows: Vec<&R> = requests
    .iter()
    .filter(|r| overlaps_month(*r, month))
    .collect();
  rows.sort_by_key(|r| std::cmp::Reverse(r.start_date()));
  rows
}
