/// 입찰 사전 검증
/// 네트워크 요청 전에 로컬 상태로 판단하는 낙관적 검증이며,
/// 최종 판단은 외부 경매 서비스가 한다.
// region:    --- Imports
use crate::auction::model::{Auction, Bid};
use crate::clock;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};

// endregion: --- Imports

/// 입찰 규칙
#[derive(Debug, Clone, Copy, Default)]
pub struct BidRules {
    /// 현재 가격 대비 최소 증가폭 (0 이면 현재 가격 초과만 요구)
    pub min_increment: f64,
}

/// 입찰 제안
#[derive(Debug, Clone)]
pub struct BidProposal {
    pub bidder: String,
    pub amount: f64,
}

/// 입찰 검증. 통과하면 now 시각의 후보 입찰을 반환한다.
pub fn validate_bid(
    auction: &Auction,
    proposal: &BidProposal,
    rules: &BidRules,
    now: DateTime<Utc>,
) -> Result<Bid> {
    if clock::is_ended(auction, now) {
        return Err(Error::EndedAuction {
            auction_id: auction.id.clone(),
        });
    }

    check_amount(proposal.amount)?;

    if proposal.amount <= auction.current_price
        || proposal.amount < auction.current_price + rules.min_increment
    {
        return Err(Error::BidTooLow {
            amount: proposal.amount,
            current_price: auction.current_price,
        });
    }

    Ok(Bid {
        bidder: proposal.bidder.clone(),
        amount: proposal.amount,
        timestamp: now,
    })
}

/// 금액 형식 검증 (양의 유한수)
pub fn check_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}
