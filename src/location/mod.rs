pub mod geolocation;
pub mod resolver;

pub use geolocation::{Coordinates, FixedPosition, GeolocationAdapter, IpPositionSource, LocationError, PositionError, PositionSource};
pub use resolver::{NominatimResolver, PlaceDescriptor, PlaceResolver, UNKNOWN};
