use crate::domain::models::{ColumnAssignment, ScheduleBlock};

// Sorted by start ascending, longer blocks first on ties, so long blocks
// claim low column numbers and short blocks pack around them.
fn sorted_indices(blocks: &[ScheduleBlock]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..blocks.len()).collect();
    order.sort_by(|&left, &right| {
        blocks[left]
            .interval
            .start_minute
            .cmp(&blocks[right].interval.start_minute)
            .then_with(|| {
                blocks[right]
                    .interval
                    .duration_minutes()
                    .cmp(&blocks[left].interval.duration_minutes())
            })
    });
    order
}

// Connected components under the overlap relation: a block joins the first
// cluster containing any member it overlaps, so a chain A-B-C lands in one
// cluster even when A and C are disjoint.
fn cluster_indices(blocks: &[ScheduleBlock], order: &[usize]) -> Vec<Vec<usize>> {
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for &index in order {
        let interval = blocks[index].interval;
        let joined = clusters.iter_mut().find(|cluster| {
            cluster
                .iter()
                .any(|&member| blocks[member].interval.overlaps(&interval))
        });
        match joined {
            Some(cluster) => cluster.push(index),
            None => clusters.push(vec![index]),
        }
    }
    clusters
}

pub fn layout(blocks: &[ScheduleBlock]) -> Vec<ColumnAssignment> {
    let order = sorted_indices(blocks);
    let clusters = cluster_indices(blocks, &order);

    let mut assignments = Vec::with_capacity(blocks.len());
    for cluster in &clusters {
        let mut column_ends: Vec<u32> = Vec::new();
        let mut placed = Vec::with_capacity(cluster.len());

        for &index in cluster {
            let interval = blocks[index].interval;
            let column = match column_ends
                .iter()
                .position(|&column_end| column_end <= interval.start_minute)
            {
                Some(found) => found,
                None => {
                    column_ends.push(0);
                    column_ends.len() - 1
                }
            };
            column_ends[column] = column_ends[column].max(interval.end_minute);
            placed.push((index, column as u32));
        }

        let total_columns = column_ends.len() as u32;
        for (index, column) in placed {
            assignments.push(ColumnAssignment {
                block_id: blocks[index].id.clone(),
                column,
                total_columns,
            });
        }
    }
    assignments
}
