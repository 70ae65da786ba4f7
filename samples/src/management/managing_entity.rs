use sbcore::management::QueueProperties;
use sbcore::management::duration;
use std::time::Duration;
use uuid::Uuid;

use super::management_client;
use crate::cli::SampleConfig;
use crate::settings::Settings;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Settings of the queue created by the sample.
pub fn initial_queue_properties() -> QueueProperties {
    QueueProperties {
        lock_duration: Some(Duration::from_secs(45)),
        max_size_in_megabytes: Some(2048),
        requires_duplicate_detection: Some(false),
        requires_session: Some(false),
        default_message_time_to_live: Some(7 * DAY),
        dead_lettering_on_message_expiration: Some(false),
        max_delivery_count: Some(8),
        enable_partitioning: Some(false),
        ..Default::default()
    }
}

pub fn apply_update(properties: &mut QueueProperties) {
    properties.max_delivery_count = Some(15);
    properties.lock_duration = Some(Duration::from_secs(5 * 60));
}

fn delivery_and_lock(properties: &QueueProperties) -> String {
    format!(
        "MaxDeliveryCount:{}; LockDuration:{}",
        properties
            .max_delivery_count
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string()),
        properties
            .lock_duration
            .map(duration::format)
            .unwrap_or_else(|| "-".to_string())
    )
}

/// Create, read, update and delete a queue through the management plane.
pub async fn run(config: SampleConfig, _settings: Settings) -> anyhow::Result<()> {
    let management = management_client(&config)?;
    let queue = Uuid::new_v4().to_string();

    println!("Creating a new Queue with name - {queue}");
    management
        .create_queue(&queue, &initial_queue_properties())
        .await?;

    println!("Retrieving the created queue");
    let created = management.get_queue(&queue).await?;
    for line in created.properties.describe_settings() {
        println!("\t{line}");
    }

    println!("Updating few properties of the queue");
    println!("Before updated - {}", delivery_and_lock(&created.properties));
    let updated = management.update_queue(&queue, apply_update).await?;
    println!("After updated - {}", delivery_and_lock(&updated.properties));

    println!("Retrieving runtime information of the queue");
    let runtime = management.get_queue(&queue).await?;
    println!("Retrieved runtime information of queue");
    for line in runtime.properties.describe_runtime() {
        println!("\t{line}");
    }

    println!("Deleting the queue");
    management.delete_queue(&queue).await?;
    println!(
        "Queue exists after delete: {}",
        management.queue_exists(&queue).await?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_raises_delivery_count_and_lock() {
        let mut properties = initial_queue_properties();
        assert_eq!(
            delivery_and_lock(&properties),
            "MaxDeliveryCount:8; LockDuration:PT45S"
        );
        apply_update(&mut properties);
        assert_eq!(
            delivery_and_lock(&properties),
            "MaxDeliveryCount:15; LockDuration:PT5M"
        );
        assert_eq!(properties.max_size_in_megabytes, Some(2048));
    }

    #[test]
    fn seven_day_time_to_live() {
        let properties = initial_queue_properties();
        assert_eq!(
            properties.default_message_time_to_live.map(duration::format),
            Some("P7D".to_string())
        );
    }
}
