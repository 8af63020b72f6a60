use crate::output::{print_json, print_table};
use svcinst_core::registry::SERVICE_ORDER;

pub fn run(json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&SERVICE_ORDER);
    }

    let rows = SERVICE_ORDER
        .iter()
        .map(|s| {
            vec![
                s.start_order.to_string(),
                s.name.to_string(),
                s.daemon.to_string(),
            ]
        })
        .collect();
    print_table(&["ORDER", "SERVICE", "DAEMON"], rows);
    Ok(())
}
