#![no_main]

use libfuzzer_sys::fuzz_target;
use pagesdns::cloudflare::{deployment_hostname, DEPLOYMENT_SUFFIX};

fuzz_target!(|data: (&str, Option<&str>)| {
    let (project, subdomain) = data;
    let hostname = deployment_hostname(project, subdomain);

    assert!(hostname.ends_with(&format!(".{DEPLOYMENT_SUFFIX}")));
    // Normalizing is idempotent.
    assert_eq!(deployment_hostname(project, Some(&hostname)), hostname);
});
