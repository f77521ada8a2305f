//! Destination matching.
//!
//! Addressed messages carry a destination locator of the form
//! `mac:<device-id>/<service>[/path][?query][#fragment]`. A session handles
//! a message only when the service segment matches its own service name
//! exactly; everything else about the locator is opaque at this layer.

/// Whether a destination addresses the given service.
///
/// Rules, all byte-exact and case-sensitive:
/// - the destination starts with the literal `mac:` prefix;
/// - a `/` follows somewhere after the prefix;
/// - the text after that first `/` starts with `service_name`, and the byte
///   immediately after the match is `/`, `?`, `#`, or end-of-string — so
///   service `iot` never matches destination service `iot2`.
///
/// The device identifier between the prefix and the `/` is not validated
/// here.
pub(crate) fn destination_matches(destination: &str, service_name: &str) -> bool {
    let Some(after_prefix) = destination.strip_prefix("mac:") else {
        return false;
    };
    let Some(slash) = after_prefix.find('/') else {
        return false;
    };
    let service = &after_prefix[slash + 1..];
    let Some(rest) = service.strip_prefix(service_name) else {
        return false;
    };
    matches!(rest.as_bytes().first(), None | Some(b'/' | b'?' | b'#'))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_matching_destinations() {
        assert!(destination_matches("mac:AABBCCDDEEFF/iot", "iot"));
        assert!(destination_matches("mac:AABBCCDDEEFF/iot/config", "iot"));
        assert!(destination_matches("mac:AABBCCDDEEFF/iot?x=1", "iot"));
        assert!(destination_matches("mac:AABBCCDDEEFF/iot#frag", "iot"));
    }

    #[test]
    fn test_service_name_must_match_whole_segment() {
        assert!(!destination_matches("mac:AABBCCDDEEFF/iot2", "iot"));
        assert!(!destination_matches("mac:AABBCCDDEEFF/iotx/config", "iot"));
        assert!(!destination_matches("mac:AABBCCDDEEFF/io", "iot"));
    }

    #[test]
    fn test_prefix_and_separator_are_required() {
        assert!(!destination_matches("foo:AABBCCDDEEFF/iot", "iot"));
        assert!(!destination_matches("mac:AABBCCDDEEFF", "iot"));
        assert!(!destination_matches("AABBCCDDEEFF/iot", "iot"));
        assert!(!destination_matches("", "iot"));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert!(!destination_matches("mac:AABBCCDDEEFF/IOT", "iot"));
        assert!(!destination_matches("MAC:AABBCCDDEEFF/iot", "iot"));
    }

    proptest! {
        #[test]
        fn prop_well_formed_destination_matches(
            device in "[0-9A-F]{12}",
            service in "[a-z][a-z0-9-]{0,15}",
        ) {
            let dest = format!("mac:{device}/{service}");
            prop_assert!(destination_matches(&dest, &service));
        }

        #[test]
        fn prop_extended_service_segment_never_matches(
            device in "[0-9A-F]{12}",
            service in "[a-z][a-z0-9-]{0,15}",
            extra in "[a-z0-9]{1,4}",
        ) {
            let dest = format!("mac:{device}/{service}{extra}");
            prop_assert!(!destination_matches(&dest, &service));
        }

        #[test]
        fn prop_terminators_preserve_match(
            device in "[0-9A-F]{12}",
            service in "[a-z][a-z0-9-]{0,15}",
            tail in "[a-z0-9=/]{0,8}",
            sep in prop::sample::select(vec!['/', '?', '#']),
        ) {
            let dest = format!("mac:{device}/{service}{sep}{tail}");
            prop_assert!(destination_matches(&dest, &service));
        }

        #[test]
        fn prop_foreign_scheme_never_matches(
            dest in "[a-z]{1,8}://[a-z0-9/.]{0,20}",
            service in "[a-z]{1,8}",
        ) {
            prop_assert!(!destination_matches(&dest, &service));
        }
    }
}
