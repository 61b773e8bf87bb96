//! [`Role`] definitions.

use common::define_kind;

define_kind! {
    #[doc = "Side a user takes in a trade."]
    enum Role {
        #[doc = "Party paying for the animals."]
        Buyer = 1,

        #[doc = "Party handing the animals over."]
        Seller = 2,
    }
}

impl Role {
    /// Returns the opposite [`Role`].
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Buyer => Self::Seller,
            Self::Seller => Self::Buyer,
        }
    }
}
