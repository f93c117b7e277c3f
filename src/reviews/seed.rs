//! Seed reviews and synthetic review generation
//!
//! When the primary source is unreachable (the sandbox account rarely has
//! review data) the aggregation falls back to this fixed seed set plus a
//! batch of generated reviews, so the dashboard always has something real
//! looking to render.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::reviews::types::{Category, Channel, PropertyRef, Review};

/// Seed for the default synthetic batch, fixed so fallback output is the
/// same run to run. Tests pass their own seeds.
pub const DEFAULT_SEED: u64 = 42;

/// How many synthetic reviews pad out the fallback set.
pub const FALLBACK_SYNTHETIC_COUNT: usize = 20;

/// A property the dashboard tracks. Doubles as the listing pool for
/// synthetic reviews and as the lookup list for external place sources.
#[derive(Debug, Clone, Copy)]
pub struct SeedProperty {
    pub id: &'static str,
    pub name: &'static str,
    pub address: &'static str,
    pub city: &'static str,
}

impl From<&SeedProperty> for PropertyRef {
    fn from(property: &SeedProperty) -> Self {
        PropertyRef {
            listing_id: property.id.to_string(),
            name: property.name.to_string(),
            address: format!("{}, {}", property.address, property.city),
        }
    }
}

pub const SEED_PROPERTIES: &[SeedProperty] = &[
    SeedProperty {
        id: "1",
        name: "Downtown Luxury Loft",
        address: "123 Main St",
        city: "San Francisco",
    },
    SeedProperty {
        id: "2",
        name: "Cozy Marina Apartment",
        address: "456 Harbor Blvd",
        city: "San Francisco",
    },
    SeedProperty {
        id: "3",
        name: "Modern SoMa Studio",
        address: "789 Tech Way",
        city: "San Francisco",
    },
];

const SYNTH_GUESTS: &[&str] = &[
    "Alex Smith",
    "Jordan Taylor",
    "Casey Johnson",
    "Riley Davis",
    "Morgan Wilson",
];

const SYNTH_CHANNELS: &[Channel] = &[
    Channel::Airbnb,
    Channel::Booking,
    Channel::Vrbo,
    Channel::Direct,
];

const SYNTH_CATEGORIES: &[Category] = &[
    Category::Overall,
    Category::Cleanliness,
    Category::Communication,
    Category::Location,
    Category::Value,
];

const SYNTH_COMMENTS: &[&str] = &[
    "Great stay overall, would recommend!",
    "Clean and comfortable accommodation.",
    "Perfect location for our needs.",
    "Host was very responsive and helpful.",
    "Good value for the price point.",
    "Beautiful property with excellent amenities.",
    "Had a wonderful time, thank you!",
    "Everything was as described, very satisfied.",
];

fn ts(value: &str) -> DateTime<Utc> {
    value.parse().expect("valid seed timestamp")
}

/// The fixed seed set: a dozen hand-written reviews across the three seed
/// properties, already in canonical form.
pub fn seed_reviews() -> Vec<Review> {
    vec![
        Review {
            id: "1".to_string(),
            listing_id: "1".to_string(),
            listing_name: "Downtown Luxury Loft".to_string(),
            guest_name: "Sarah Johnson".to_string(),
            rating: 5,
            comment: "Absolutely stunning property! The views are incredible and the location is perfect. Everything was spotless and the host was very responsive. Would definitely stay here again.".to_string(),
            date: ts("2024-01-15T10:30:00Z"),
            channel: Channel::Airbnb,
            category: Category::Overall,
            is_approved: true,
            is_displayed: true,
            response_from_host: Some("Thank you so much Sarah! We're thrilled you enjoyed your stay.".to_string()),
            response_date: Some(ts("2024-01-16T09:15:00Z")),
            tags: vec!["cleanliness".to_string(), "location".to_string(), "views".to_string()],
        },
        Review {
            id: "2".to_string(),
            listing_id: "1".to_string(),
            listing_name: "Downtown Luxury Loft".to_string(),
            guest_name: "Michael Chen".to_string(),
            rating: 4,
            comment: "Great location and beautiful space. The only minor issue was the noise from the street at night, but overall a fantastic stay.".to_string(),
            date: ts("2024-01-10T14:20:00Z"),
            channel: Channel::Booking,
            category: Category::Location,
            is_approved: true,
            is_displayed: true,
            response_from_host: None,
            response_date: None,
            tags: vec!["location".to_string(), "noise".to_string()],
        },
        Review {
            id: "3".to_string(),
            listing_id: "1".to_string(),
            listing_name: "Downtown Luxury Loft".to_string(),
            guest_name: "Emily Rodriguez".to_string(),
            rating: 5,
            comment: "Perfect for our business trip. The workspace setup was excellent and check-in was seamless.".to_string(),
            date: ts("2024-01-08T16:45:00Z"),
            channel: Channel::Direct,
            category: Category::Checkin,
            is_approved: true,
            is_displayed: true,
            response_from_host: None,
            response_date: None,
            tags: vec!["business".to_string(), "workspace".to_string(), "checkin".to_string()],
        },
        Review {
            id: "4".to_string(),
            listing_id: "1".to_string(),
            listing_name: "Downtown Luxury Loft".to_string(),
            guest_name: "David Park".to_string(),
            rating: 3,
            comment: "The apartment was nice but had some cleanliness issues. The bathroom could have been better maintained.".to_string(),
            date: ts("2024-01-05T11:30:00Z"),
            channel: Channel::Vrbo,
            category: Category::Cleanliness,
            is_approved: false,
            is_displayed: false,
            response_from_host: None,
            response_date: None,
            tags: vec!["cleanliness".to_string(), "maintenance".to_string()],
        },
        Review {
            id: "5".to_string(),
            listing_id: "2".to_string(),
            listing_name: "Cozy Marina Apartment".to_string(),
            guest_name: "Lisa Thompson".to_string(),
            rating: 5,
            comment: "Amazing waterfront location! The apartment was cozy and had everything we needed. The host provided excellent local recommendations.".to_string(),
            date: ts("2024-01-12T09:15:00Z"),
            channel: Channel::Airbnb,
            category: Category::Overall,
            is_approved: true,
            is_displayed: true,
            response_from_host: Some("So happy you enjoyed the marina views Lisa! Thanks for being a wonderful guest.".to_string()),
            response_date: Some(ts("2024-01-13T08:00:00Z")),
            tags: vec!["location".to_string(), "recommendations".to_string(), "waterfront".to_string()],
        },
        Review {
            id: "6".to_string(),
            listing_id: "2".to_string(),
            listing_name: "Cozy Marina Apartment".to_string(),
            guest_name: "James Wilson".to_string(),
            rating: 4,
            comment: "Good value for money. The location is excellent for walking and the apartment was clean and comfortable.".to_string(),
            date: ts("2024-01-07T13:20:00Z"),
            channel: Channel::Booking,
            category: Category::Value,
            is_approved: true,
            is_displayed: true,
            response_from_host: None,
            response_date: None,
            tags: vec!["value".to_string(), "walking".to_string(), "comfortable".to_string()],
        },
        Review {
            id: "7".to_string(),
            listing_id: "2".to_string(),
            listing_name: "Cozy Marina Apartment".to_string(),
            guest_name: "Anna Martinez".to_string(),
            rating: 4,
            comment: "Lovely apartment with great views. Communication with the host was excellent throughout our stay.".to_string(),
            date: ts("2024-01-03T15:45:00Z"),
            channel: Channel::Direct,
            category: Category::Communication,
            is_approved: true,
            is_displayed: true,
            response_from_host: None,
            response_date: None,
            tags: vec!["views".to_string(), "communication".to_string(), "host".to_string()],
        },
        Review {
            id: "8".to_string(),
            listing_id: "3".to_string(),
            listing_name: "Modern SoMa Studio".to_string(),
            guest_name: "Robert Kim".to_string(),
            rating: 5,
            comment: "Perfect for a business trip. Great workspace setup and super fast WiFi. Location is ideal for accessing downtown.".to_string(),
            date: ts("2024-01-14T12:00:00Z"),
            channel: Channel::Airbnb,
            category: Category::Overall,
            is_approved: true,
            is_displayed: true,
            response_from_host: None,
            response_date: None,
            tags: vec!["business".to_string(), "workspace".to_string(), "wifi".to_string(), "downtown".to_string()],
        },
        Review {
            id: "9".to_string(),
            listing_id: "3".to_string(),
            listing_name: "Modern SoMa Studio".to_string(),
            guest_name: "Jennifer Lee".to_string(),
            rating: 4,
            comment: "Clean and modern studio with good amenities. The building has nice facilities and the check-in process was smooth.".to_string(),
            date: ts("2024-01-09T10:30:00Z"),
            channel: Channel::Vrbo,
            category: Category::Checkin,
            is_approved: true,
            is_displayed: true,
            response_from_host: None,
            response_date: None,
            tags: vec!["modern".to_string(), "amenities".to_string(), "facilities".to_string()],
        },
        Review {
            id: "10".to_string(),
            listing_id: "3".to_string(),
            listing_name: "Modern SoMa Studio".to_string(),
            guest_name: "Mark Davis".to_string(),
            rating: 3,
            comment: "The studio was okay but felt a bit cramped for two people. Location is good though.".to_string(),
            date: ts("2024-01-06T14:15:00Z"),
            channel: Channel::Booking,
            category: Category::Accuracy,
            is_approved: false,
            is_displayed: false,
            response_from_host: None,
            response_date: None,
            tags: vec!["space".to_string(), "cramped".to_string(), "location".to_string()],
        },
        Review {
            id: "11".to_string(),
            listing_id: "1".to_string(),
            listing_name: "Downtown Luxury Loft".to_string(),
            guest_name: "Sophie Brown".to_string(),
            rating: 5,
            comment: "Exceptional stay! The loft exceeded all expectations. Beautiful design, perfect location, and the host went above and beyond.".to_string(),
            date: ts("2023-12-28T16:20:00Z"),
            channel: Channel::Airbnb,
            category: Category::Overall,
            is_approved: true,
            is_displayed: true,
            response_from_host: None,
            response_date: None,
            tags: vec!["design".to_string(), "expectations".to_string(), "host".to_string()],
        },
        Review {
            id: "12".to_string(),
            listing_id: "2".to_string(),
            listing_name: "Cozy Marina Apartment".to_string(),
            guest_name: "Tom Anderson".to_string(),
            rating: 2,
            comment: "The apartment had some maintenance issues and the WiFi was unreliable. The location was the only redeeming factor.".to_string(),
            date: ts("2023-12-25T11:45:00Z"),
            channel: Channel::Vrbo,
            category: Category::Overall,
            is_approved: false,
            is_displayed: false,
            response_from_host: None,
            response_date: None,
            tags: vec!["maintenance".to_string(), "wifi".to_string(), "issues".to_string()],
        },
    ]
}

/// Generate `count` synthetic reviews from a fixed rng seed.
///
/// The pools (guests, channels, categories, comments, listings) cycle by
/// index; the rng only drives ratings, dates, and moderation flags. Ids
/// continue after the seed set so the two never collide.
pub fn generate_additional_seeded(count: usize, rng_seed: u64) -> Vec<Review> {
    let mut rng = StdRng::seed_from_u64(rng_seed);
    let now = Utc::now();

    (0..count)
        .map(|index| {
            let property = &SEED_PROPERTIES[index % SEED_PROPERTIES.len()];
            let rating: u8 = rng.gen_range(4..=5);
            let days_back: f64 = rng.gen_range(0.0..30.0);
            let date = now - Duration::seconds((days_back * 86_400.0) as i64);
            let is_approved = rng.gen_bool(0.8);
            let is_displayed = rng.gen_bool(0.7);

            Review {
                id: format!("review-{}", index + 13),
                listing_id: property.id.to_string(),
                listing_name: property.name.to_string(),
                guest_name: SYNTH_GUESTS[index % SYNTH_GUESTS.len()].to_string(),
                rating,
                comment: SYNTH_COMMENTS[index % SYNTH_COMMENTS.len()].to_string(),
                date,
                channel: SYNTH_CHANNELS[index % SYNTH_CHANNELS.len()],
                category: SYNTH_CATEGORIES[index % SYNTH_CATEGORIES.len()],
                is_approved,
                is_displayed,
                response_from_host: None,
                response_date: None,
                tags: Vec::new(),
            }
        })
        .collect()
}

/// Generate `count` synthetic reviews with the default seed.
pub fn generate_additional(count: usize) -> Vec<Review> {
    generate_additional_seeded(count, DEFAULT_SEED)
}
