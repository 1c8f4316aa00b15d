// Mirrors the statements in `db::migrations::MIGRATIONS`.

diesel::table! {
    #[sql_name = "_database_metadata_"]
    database_metadata (name) {
        name -> Text,
        value -> Nullable<Text>,
    }
}

diesel::table! {
    singularity (singularity_id) {
        singularity_id -> BigInt,
        url -> Nullable<Text>,
    }
}

diesel::table! {
    req (req_id) {
        req_id -> BigInt,
        singularity_id -> Nullable<BigInt>,
        request_ident -> Nullable<Text>,
        instances -> Nullable<Integer>,
        #[sql_name = "type"]
        request_type -> Nullable<Text>,
        state -> Nullable<Text>,
        captured_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    task (task_id) {
        task_id -> BigInt,
        req_id -> Nullable<BigInt>,
        deploy_ident -> Nullable<Text>,
        status -> Nullable<Text>,
    }
}

diesel::table! {
    env (env_id) {
        env_id -> BigInt,
        task_id -> Nullable<BigInt>,
        name -> Nullable<Text>,
        value -> Nullable<Text>,
    }
}

diesel::table! {
    docker_image (docker_image_id) {
        docker_image_id -> BigInt,
        task_id -> Nullable<BigInt>,
        image_name -> Nullable<Text>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    database_metadata,
    singularity,
    req,
    task,
    env,
    docker_image,
);
