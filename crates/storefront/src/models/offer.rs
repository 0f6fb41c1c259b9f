//! Promotional offers shown in the landing page banner.

use rand::seq::IndexedRandom;
use serde::Serialize;

/// A promotional banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Offer {
    pub id: u32,
    pub discount: &'static str,
    pub offer_type: &'static str,
    pub description: &'static str,
    pub link_href: &'static str,
    pub link_text: &'static str,
    pub image_url: &'static str,
}

const BANNER_IMAGE: &str = "https://img.freepik.com/free-photo/delicious-chicken-rolls-stuffed-with-cheese-spinach-wrapped-strips-bacon-top-view_2829-17420.jpg?w=740&q=80";

/// The offers currently running.
pub static OFFERS: [Offer; 3] = [
    Offer {
        id: 1,
        discount: "50%",
        offer_type: "OFF",
        description: "on your dining bills with LunchBox",
        link_href: "/offers/dining-deals",
        link_text: "Check Dining Deals",
        image_url: BANNER_IMAGE,
    },
    Offer {
        id: 2,
        discount: "₹100",
        offer_type: "Cashback",
        description: "on orders above ₹299",
        link_href: "/offers/cashback",
        link_text: "View Cashback T&C",
        image_url: BANNER_IMAGE,
    },
    Offer {
        id: 3,
        discount: "30%",
        offer_type: "OFF",
        description: "on all breakfast items today!",
        link_href: "/offers/breakfast",
        link_text: "Order Breakfast",
        image_url: BANNER_IMAGE,
    },
];

/// Pick one offer uniformly at random.
#[must_use]
pub fn random_offer() -> &'static Offer {
    let [first, ..] = &OFFERS;
    OFFERS.choose(&mut rand::rng()).unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_random_offer_is_one_of_the_offers() {
        for _ in 0..20 {
            assert!(OFFERS.contains(random_offer()));
        }
    }

    #[test]
    fn test_random_offer_eventually_varies() {
        let seen: HashSet<u32> = (0..200).map(|_| random_offer().id).collect();
        assert_eq!(seen.len(), OFFERS.len());
    }
}
