//! Fixed state -> region lookup.
//!
//! Accepts full state names and USPS codes, case-insensitively. The District of
//! Columbia is grouped with the Mid-Atlantic states.

use crate::domain::Region;

const STATES: &[(&str, &str, Region)] = &[
    ("CT", "Connecticut", Region::NewEngland),
    ("ME", "Maine", Region::NewEngland),
    ("MA", "Massachusetts", Region::NewEngland),
    ("NH", "New Hampshire", Region::NewEngland),
    ("RI", "Rhode Island", Region::NewEngland),
    ("VT", "Vermont", Region::NewEngland),
    ("NJ", "New Jersey", Region::MidAtlantic),
    ("NY", "New York", Region::MidAtlantic),
    ("PA", "Pennsylvania", Region::MidAtlantic),
    ("DE", "Delaware", Region::MidAtlantic),
    ("MD", "Maryland", Region::MidAtlantic),
    ("DC", "District of Columbia", Region::MidAtlantic),
    ("AL", "Alabama", Region::South),
    ("AR", "Arkansas", Region::South),
    ("FL", "Florida", Region::South),
    ("GA", "Georgia", Region::South),
    ("KY", "Kentucky", Region::South),
    ("LA", "Louisiana", Region::South),
    ("MS", "Mississippi", Region::South),
    ("NC", "North Carolina", Region::South),
    ("SC", "South Carolina", Region::South),
    ("TN", "Tennessee", Region::South),
    ("VA", "Virginia", Region::South),
    ("WV", "West Virginia", Region::South),
    ("IL", "Illinois", Region::Midwest),
    ("IN", "Indiana", Region::Midwest),
    ("IA", "Iowa", Region::Midwest),
    ("KS", "Kansas", Region::Midwest),
    ("MI", "Michigan", Region::Midwest),
    ("MN", "Minnesota", Region::Midwest),
    ("MO", "Missouri", Region::Midwest),
    ("NE", "Nebraska", Region::Midwest),
    ("ND", "North Dakota", Region::Midwest),
    ("OH", "Ohio", Region::Midwest),
    ("SD", "South Dakota", Region::Midwest),
    ("WI", "Wisconsin", Region::Midwest),
    ("AZ", "Arizona", Region::Southwest),
    ("NM", "New Mexico", Region::Southwest),
    ("OK", "Oklahoma", Region::Southwest),
    ("TX", "Texas", Region::Southwest),
    ("AK", "Alaska", Region::West),
    ("CA", "California", Region::West),
    ("CO", "Colorado", Region::West),
    ("HI", "Hawaii", Region::West),
    ("ID", "Idaho", Region::West),
    ("MT", "Montana", Region::West),
    ("NV", "Nevada", Region::West),
    ("OR", "Oregon", Region::West),
    ("UT", "Utah", Region::West),
    ("WA", "Washington", Region::West),
    ("WY", "Wyoming", Region::West),
];

/// Region for a state name or code; `None` if the state is not recognized.
pub fn region_for_state(state: &str) -> Option<Region> {
    let key = state.split_whitespace().collect::<Vec<_>>().join(" ");
    STATES
        .iter()
        .find(|(code, name, _)| key.eq_ignore_ascii_case(code) || key.eq_ignore_ascii_case(name))
        .map(|(_, _, region)| *region)
}
