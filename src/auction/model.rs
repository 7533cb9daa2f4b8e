use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// region:    --- Category
/// 경매 카테고리 (고정 목록, 알 수 없는 값은 Other)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Electronics,
    Fashion,
    Home,
    Art,
    Collectibles,
    Sports,
    Vehicles,
    Jewelry,
    Books,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::Fashion => "Fashion",
            Category::Home => "Home",
            Category::Art => "Art",
            Category::Collectibles => "Collectibles",
            Category::Sports => "Sports",
            Category::Vehicles => "Vehicles",
            Category::Jewelry => "Jewelry",
            Category::Books => "Books",
            Category::Other => "Other",
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "electronics" => Category::Electronics,
            "fashion" => Category::Fashion,
            "home" => Category::Home,
            "art" => Category::Art,
            "collectibles" => Category::Collectibles,
            "sports" => Category::Sports,
            "vehicles" => Category::Vehicles,
            "jewelry" => Category::Jewelry,
            "books" => Category::Books,
            _ => Category::Other,
        }
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_string()
    }
}

// endregion: --- Category

// region:    --- Auction
/// 저장된 경매 상태. 실제 종료 여부는 clock::is_ended 로 판단한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    Active,
    Ended,
}

/// 입찰 모델
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub bidder: String,
    pub amount: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Bid {
    /// 같은 입찰자, 금액, 시각이면 같은 입찰로 본다
    pub fn same_as(&self, other: &Bid) -> bool {
        self.bidder == other.bidder
            && self.amount.to_bits() == other.amount.to_bits()
            && self.timestamp == other.timestamp
    }
}

/// 경매 모델 (외부 서비스의 AuctionSnapshot 과 같은 형태)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub image: Option<String>,
    pub starting_price: f64,
    pub current_price: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub bids: Vec<Bid>,
    pub seller: String,
    pub status: AuctionStatus,
    #[serde(default)]
    pub finalized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    /// 마지막으로 연장을 일으킨 입찰 시각 (로컬 전용)
    #[serde(skip)]
    pub extended_for: Option<DateTime<Utc>>,
}

impl Auction {
    /// 가장 최근 입찰
    pub fn leading_bid(&self) -> Option<&Bid> {
        self.bids.last()
    }

    pub fn has_bid(&self, bid: &Bid) -> bool {
        self.bids.iter().any(|b| b.same_as(bid))
    }

    /// 남은 입찰 중 최고 금액, 없으면 시작 가격
    pub fn recompute_price(&mut self) {
        self.current_price = self
            .bids
            .iter()
            .map(|b| b.amount)
            .fold(self.starting_price, f64::max);
    }
}

// endregion: --- Auction

// region:    --- Listing
/// 경매 등록 요청
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuction {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub image: Option<String>,
    pub starting_price: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    pub seller: String,
}

impl NewAuction {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidListing("제목이 비어 있습니다.".to_string()));
        }
        if !self.starting_price.is_finite() || self.starting_price <= 0.0 {
            return Err(Error::InvalidListing(format!(
                "시작 가격은 양수여야 합니다: {}",
                self.starting_price
            )));
        }
        if self.end_time <= now {
            return Err(Error::InvalidListing(
                "종료 시간은 현재 이후여야 합니다.".to_string(),
            ));
        }
        if self.seller.trim().is_empty() {
            return Err(Error::InvalidListing("판매자 정보가 없습니다.".to_string()));
        }
        Ok(())
    }
}

// endregion: --- Listing

// region:    --- Patch
/// 부분 업데이트 (auctionUpdated 이벤트, 관리자 수정 요청)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionPatch {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AuctionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bids: Option<Vec<Bid>>,
}

impl AuctionPatch {
    pub fn end_time(id: impl Into<String>, end_time: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            end_time: Some(end_time),
            ..Default::default()
        }
    }

    /// 값이 있는 필드만 덮어쓴다
    pub fn merge_into(&self, auction: &mut Auction) {
        if let Some(title) = &self.title {
            auction.title = title.clone();
        }
        if let Some(description) = &self.description {
            auction.description = description.clone();
        }
        if let Some(category) = self.category {
            auction.category = category;
        }
        if let Some(image) = &self.image {
            auction.image = Some(image.clone());
        }
        if let Some(end_time) = self.end_time {
            auction.end_time = end_time;
        }
        if let Some(status) = self.status {
            auction.status = status;
        }
        if let Some(finalized) = self.finalized {
            auction.finalized = finalized;
        }
        if let Some(winner) = &self.winner {
            auction.winner = Some(winner.clone());
        }
        if let Some(bids) = &self.bids {
            auction.bids = bids.clone();
            auction.recompute_price();
        }
        if let Some(current_price) = self.current_price {
            auction.current_price = current_price;
        }
    }
}

// endregion: --- Patch
