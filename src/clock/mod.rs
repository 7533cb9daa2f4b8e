/// 경매 시계
/// 저장된 status 는 실제 시간보다 늦게 갱신될 수 있으므로
/// 종료 여부는 항상 이 모듈의 is_ended 로 판단한다.
// region:    --- Imports
use crate::auction::model::{Auction, AuctionStatus};
use chrono::{DateTime, Duration, Utc};

// endregion: --- Imports

// region:    --- Predicates
/// 경매 종료 여부
pub fn is_ended(auction: &Auction, now: DateTime<Utc>) -> bool {
    auction.status == AuctionStatus::Ended || auction.end_time <= now
}

/// 남은 시간 (종료된 경매는 0)
pub fn time_remaining(auction: &Auction, now: DateTime<Utc>) -> std::time::Duration {
    if is_ended(auction, now) {
        return std::time::Duration::ZERO;
    }
    (auction.end_time - now)
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}

// endregion: --- Predicates

// region:    --- Extension Rule
/// 3분 규칙: 종료 직전 입찰이 들어오면 종료 시간을 연장한다
#[derive(Debug, Clone, Copy)]
pub struct ExtensionRule {
    pub enabled: bool,
    /// 입찰이 이 시간 안에 수락된 경우에만 적용
    pub window: Duration,
    /// 남은 시간이 이보다 짧으면 now + threshold 로 연장
    pub threshold: Duration,
}

impl Default for ExtensionRule {
    fn default() -> Self {
        Self {
            enabled: true,
            window: Duration::seconds(60),
            threshold: Duration::minutes(3),
        }
    }
}

impl ExtensionRule {
    /// 연장된 종료 시간을 계산한다. 연장 대상이 아니면 None.
    pub fn evaluate(
        &self,
        auction: &Auction,
        bid_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        if !self.enabled || is_ended(auction, now) {
            return None;
        }

        // 같은 입찰로 두 번 연장하지 않는다
        if matches!(auction.extended_for, Some(prev) if bid_time <= prev) {
            return None;
        }

        if bid_time > now || now - bid_time > self.window {
            return None;
        }

        if auction.end_time - now >= self.threshold {
            return None;
        }

        let extended = now + self.threshold;
        (extended > auction.end_time).then_some(extended)
    }

    /// 연장을 적용하고 새 종료 시간을 반환한다
    pub fn apply(
        &self,
        auction: &mut Auction,
        bid_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let extended = self.evaluate(auction, bid_time, now)?;
        auction.end_time = extended;
        auction.extended_for = Some(bid_time);
        Some(extended)
    }
}

// endregion: --- Extension Rule
